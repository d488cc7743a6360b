use scraper::ElementRef;

/// Builds the structural locator of an element
///
/// The path runs from the document's root element down to `element`, each
/// segment being `tag[n]` where `n` is the element's 1-based rank among the
/// preceding siblings that share its tag name. Text and comment nodes do not
/// count. The path disambiguates occurrences; it is not meant for navigation.
///
/// # Example
///
/// ```
/// use res_scan::extract::build_dom_path;
/// use scraper::{Html, Selector};
///
/// let html = Html::parse_document("<html><body><p></p><div></div><p id=x></p></body></html>");
/// let selector = Selector::parse("#x").unwrap();
/// let element = html.select(&selector).next().unwrap();
/// assert_eq!(build_dom_path(element), "/html[1]/body[1]/p[2]");
/// ```
pub fn build_dom_path(element: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(element);

    while let Some(node) = current {
        let name = node.value().name();
        let rank = 1 + node
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| sibling.value().name() == name)
            .count();
        segments.push(format!("{}[{}]", name, rank));
        current = node.parent().and_then(ElementRef::wrap);
    }

    segments.reverse();
    format!("/{}", segments.join("/"))
}
