/// Raw value of a URL-bearing attribute
///
/// HTML allows some attributes to carry several values; an element may also
/// expose the same attribute name more than once (for example `href` and the
/// SVG `xlink:href`). Those cases are represented as a list, which may nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue<'a> {
    Single(&'a str),
    List(Vec<AttributeValue<'a>>),
}

/// Yields the candidate URLs carried by an attribute value
///
/// `srcset` values are split on commas and only the leading token of each
/// entry is kept, dropping width and density descriptors. Any other attribute
/// yields its trimmed value when non-empty. Lists are flattened recursively.
///
/// # Example
///
/// ```
/// use res_scan::extract::{parse_attribute_urls, AttributeValue};
///
/// let value = AttributeValue::Single("a.png 1x, b.png 2x");
/// let urls: Vec<&str> = parse_attribute_urls("srcset", &value).collect();
/// assert_eq!(urls, vec!["a.png", "b.png"]);
/// ```
pub fn parse_attribute_urls<'v>(
    attr_name: &str,
    value: &'v AttributeValue<'v>,
) -> Box<dyn Iterator<Item = &'v str> + 'v> {
    candidates(attr_name == "srcset", value)
}

fn candidates<'v>(
    srcset: bool,
    value: &'v AttributeValue<'v>,
) -> Box<dyn Iterator<Item = &'v str> + 'v> {
    match value {
        AttributeValue::List(items) => {
            Box::new(items.iter().flat_map(move |item| candidates(srcset, item)))
        }
        AttributeValue::Single(raw) if srcset => {
            let raw: &'v str = raw;
            Box::new(
                raw.split(',')
                    .filter_map(|entry| entry.split_whitespace().next()),
            )
        }
        AttributeValue::Single(raw) => {
            let raw: &'v str = raw;
            Box::new(std::iter::once(raw.trim()).filter(|candidate| !candidate.is_empty()))
        }
    }
}
