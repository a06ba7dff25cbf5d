//! Listing page parsing.
//!
//! A listing page of the reference site is an HTML table with one row per
//! class. Rows carry the `ddcr` class; the row of the currently selected
//! class additionally carries `somethingchosen` and is skipped, since that
//! class was discovered one level up. A cell holding a `word` div as a
//! direct child is a class cell: the `word` element holds the class name
//! and a `ddcnum` element its raw number:
//!
//! ```html
//! <tr class="ddcr">
//!   <td><div class="ddcnum">636.7</div><div class="word">Dogs</div></td>
//! </tr>
//! ```
//!
//! The page is parsed as a full HTML document, so attribute quoting,
//! entities and nested markup inside a name are handled the way a browser
//! handles them.
//!
//! The source also lists placeholder rows (unassigned numbers, retired
//! classes, form divisions) that are not classes at all;
//! [`is_placeholder_name`] recognizes them.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::ListingEntry;

static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("tr.ddcr:not(.somethingchosen) td").expect("valid cell selector")
});
static NUMBER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ddcnum").expect("valid number selector"));
static NAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".word").expect("valid name selector"));

const NAME_CLASS: &str = "word";

/// Parse the class rows of a listing page, in page order.
///
/// Rows whose name is a placeholder (see [`is_placeholder_name`]) are
/// dropped.
pub fn parse_listing(html: &str) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);

    document
        .select(&CELL_SELECTOR)
        .filter(|cell| has_name_child(cell))
        .filter_map(|cell| {
            let name = selected_text(&cell, &NAME_SELECTOR);
            let number = selected_text(&cell, &NUMBER_SELECTOR);
            (!is_placeholder_name(&name)).then_some(ListingEntry { number, name })
        })
        .collect()
}

/// Whether a listing name marks a placeholder row rather than a class.
///
/// Placeholders are: empty names, the `>` navigation marker, names starting
/// with a dash or en dash, retired classes (`[No Longer ...]`), anything
/// mentioning "assigned" in any case, `Invalid number`, and standard
/// subdivision form rows (`[form ...]`).
pub fn is_placeholder_name(name: &str) -> bool {
    name.is_empty()
        || name == ">"
        || name.starts_with('-')
        || name.starts_with('\u{2013}')
        || name.contains("[No Longer")
        || name.to_lowercase().contains("assigned")
        || name == "Invalid number"
        || name.starts_with("[form")
}

/// `td:has(> div.word)`
fn has_name_child(cell: &ElementRef<'_>) -> bool {
    cell.children().filter_map(ElementRef::wrap).any(|child| {
        child.value().name() == "div" && child.value().classes().any(|c| c == NAME_CLASS)
    })
}

/// Text of every element matching `selector` under `cell`, with
/// whitespace collapsed.
fn selected_text(cell: &ElementRef<'_>, selector: &Selector) -> String {
    let text: String = cell.select(selector).flat_map(|el| el.text()).collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <table class="ddc">
          <tr class="ddcr somethingchosen">
            <td><div class="ddcnum">63</div><div class="word">Agriculture</div></td>
          </tr>
          <tr class="ddcr">
            <td class="n"><div class="ddcnum">636</div>
              <div class="word">Animal husbandry</div></td>
          </tr>
          <tr class="ddcr">
            <td><div class="ddcnum">637</div><div class="word">Dairy &amp; related products</div></td>
          </tr>
          <tr class="ddcr">
            <td><div class="ddcnum">638</div><div class="word">[Unassigned]</div></td>
          </tr>
          <tr class="other">
            <td><div class="ddcnum">639</div><div class="word">Not a class row</div></td>
          </tr>
          <tr class='ddcr'>
            <td><span class="ddcnum">639.2</span><div class="word">Fishing</div></td>
            <td>no word here</td>
          </tr>
        </table>
    "#;

    fn table(rows: &str) -> String {
        format!("<html><body><table>{}</table></body></html>", rows)
    }

    #[test]
    fn test_parse_listing_rows() {
        let entries = parse_listing(PAGE);
        assert_eq!(
            entries,
            vec![
                ListingEntry::new("636", "Animal husbandry"),
                ListingEntry::new("637", "Dairy & related products"),
                ListingEntry::new("639.2", "Fishing"),
            ]
        );
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_listing("<html><body>nothing</body></html>").is_empty());
    }

    #[test]
    fn test_unquoted_class_attribute() {
        let html = table(r#"<tr class=ddcr><td><div class=ddcnum>636</div><div class=word>Animal husbandry</div></td></tr>"#);
        assert_eq!(parse_listing(&html), vec![ListingEntry::new("636", "Animal husbandry")]);
    }

    #[test]
    fn test_data_attribute_does_not_hide_class() {
        let html = table(r#"<tr data-class="x" class="ddcr"><td><div class="ddcnum">636</div><div class="word">Animal husbandry</div></td></tr>"#);
        assert_eq!(parse_listing(&html), vec![ListingEntry::new("636", "Animal husbandry")]);
    }

    #[test]
    fn test_nested_markup_in_name() {
        let html = table(r#"<tr class="ddcr"><td><div class="ddcnum">636</div><div class="word">Animal <div class="i">husbandry</div> and care</div></td></tr>"#);
        assert_eq!(
            parse_listing(&html),
            vec![ListingEntry::new("636", "Animal husbandry and care")]
        );
    }

    #[test]
    fn test_name_must_be_direct_child_of_cell() {
        let html = table(r#"<tr class="ddcr"><td><a href="/mds/636"><div class="ddcnum">636</div><div class="word">Animal husbandry</div></a></td></tr>"#);
        assert!(parse_listing(&html).is_empty());
    }

    #[test]
    fn test_entities_are_decoded() {
        let html = table(r#"<tr class="ddcr"><td><div class="ddcnum">944</div><div class="word">France &amp; Monaco&nbsp;&#8212; &#xE9;t&#233;</div></td></tr>"#);
        assert_eq!(parse_listing(&html)[0].name, "France & Monaco \u{2014} \u{e9}t\u{e9}");
    }

    #[test]
    fn test_placeholder_names() {
        assert!(is_placeholder_name(""));
        assert!(is_placeholder_name(">"));
        assert!(is_placeholder_name("-01 Philosophy and theory"));
        assert!(is_placeholder_name("\u{2013}09 History"));
        assert!(is_placeholder_name("[No Longer Used]"));
        assert!(is_placeholder_name("Not ASSIGNED"));
        assert!(is_placeholder_name("Invalid number"));
        assert!(is_placeholder_name("[form divisions]"));

        assert!(!is_placeholder_name("Dogs"));
        assert!(!is_placeholder_name("Animal husbandry"));
    }
}
