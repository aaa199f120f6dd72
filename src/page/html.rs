// src/page/html.rs
use std::sync::{Mutex, PoisonError};

use scraper::{ElementRef, Html, Selector};

use super::{ElementSnapshot, PageInspector};

/// Width assumed for elements that carry no layout hint.
const DEFAULT_RENDERED_WIDTH: u32 = 1;

/// Detection against captured player markup. Layout does not exist in a
/// snapshot, so the rendered width comes from a `data-rendered-width`
/// attribute when present, otherwise from inline hiding (`hidden`,
/// `display:none`, `visibility:hidden`, `width:0`) on the element or any
/// ancestor.
pub struct HtmlSnapshotPage {
    // `scraper::Html` is not `Sync`; the document is parsed per query.
    html: Mutex<String>,
}

impl HtmlSnapshotPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: Mutex::new(html.into()),
        }
    }

    /// Swap in a newer capture of the same page.
    pub fn set_html(&self, html: impl Into<String>) {
        *self.html.lock().unwrap_or_else(PoisonError::into_inner) = html.into();
    }
}

fn style_hides(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact
        .split(';')
        .any(|decl| matches!(decl, "display:none" | "visibility:hidden" | "width:0" | "width:0px"))
}

fn hidden_by_markup(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    v.attr("hidden").is_some() || v.attr("style").is_some_and(style_hides)
}

fn rendered_width(el: &ElementRef<'_>) -> u32 {
    if let Some(w) = el
        .value()
        .attr("data-rendered-width")
        .and_then(|w| w.trim().parse::<u32>().ok())
    {
        return w;
    }
    let hidden = hidden_by_markup(el)
        || el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| hidden_by_markup(&a));
    if hidden {
        0
    } else {
        DEFAULT_RENDERED_WIDTH
    }
}

impl PageInspector for HtmlSnapshotPage {
    fn query_all(&self, selector: &str) -> Vec<ElementSnapshot> {
        let Ok(sel) = Selector::parse(selector) else {
            tracing::trace!(target: "adlapse::page", selector, "unparsable selector");
            return Vec::new();
        };
        let html = self.html.lock().unwrap_or_else(PoisonError::into_inner);
        let document = Html::parse_document(&html);
        document
            .select(&sel)
            .map(|el| ElementSnapshot {
                class_name: el.value().attr("class").unwrap_or_default().to_string(),
                text: el.text().collect::<String>(),
                rendered_width: rendered_width(&el),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_hiding_and_width_hints() {
        let page = HtmlSnapshotPage::new(
            r#"<div class="player">
                 <span class="a">shown</span>
                 <span class="b" style="display: none">gone</span>
                 <div hidden><span class="c">inside hidden</span></div>
                 <span class="d" data-rendered-width="0">zero</span>
                 <span class="e" data-rendered-width="84">wide</span>
               </div>"#,
        );
        assert!(page.query_first(".a").unwrap().is_visible());
        assert!(!page.query_first(".b").unwrap().is_visible());
        assert!(!page.query_first(".c").unwrap().is_visible());
        assert!(!page.query_first(".d").unwrap().is_visible());
        assert_eq!(page.query_first(".e").unwrap().rendered_width, 84);
    }

    #[test]
    fn bad_selector_is_no_match() {
        let page = HtmlSnapshotPage::new("<p class='x'>x</p>");
        assert!(page.query_all("..[[").is_empty());
    }
}
