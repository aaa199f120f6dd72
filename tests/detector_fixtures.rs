// tests/detector_fixtures.rs
//
// Ad detection against captured player markup.

use adlapse::detector::DetectorSelectors;
use adlapse::page::{HtmlSnapshotPage, PageInspector};
use adlapse::{AdDetector, AdSignal};

const AD_BREAK: &str = include_str!("fixtures/player_ad_break.html");
const FEATURE: &str = include_str!("fixtures/player_feature.html");
const RESUME: &str = include_str!("fixtures/player_resume_message.html");

#[test]
fn ad_break_capture_is_an_ad() {
    let page = HtmlSnapshotPage::new(AD_BREAK);
    let detector = AdDetector::default();
    assert!(detector.detect(&page));
    assert_eq!(detector.classify(&page), Some(AdSignal::AdTimer));
}

#[test]
fn hidden_leftovers_do_not_count() {
    let page = HtmlSnapshotPage::new(FEATURE);
    // the leftovers are there, just not rendered
    let timer = page
        .query_first(".atvwebplayersdk-ad-timer-text")
        .expect("leftover timer node");
    assert_eq!(timer.text, "Ad 2 of 2");
    assert!(!timer.is_visible());

    assert_eq!(AdDetector::default().classify(&page), None);
}

#[test]
fn resume_message_alone_is_an_ad() {
    let page = HtmlSnapshotPage::new(RESUME);
    assert_eq!(
        AdDetector::default().classify(&page),
        Some(AdSignal::ResumeMessage)
    );
}

#[test]
fn recapture_flips_detection() {
    let page = HtmlSnapshotPage::new(FEATURE);
    let detector = AdDetector::default();
    assert!(!detector.detect(&page));
    page.set_html(AD_BREAK);
    assert!(detector.detect(&page));
    page.set_html(FEATURE);
    assert!(!detector.detect(&page));
}

#[test]
fn renamed_player_classes_via_selectors() {
    let html = r#"<div class="vp-ad-countdown">Ad 0:12</div>"#;
    let page = HtmlSnapshotPage::new(html);
    assert!(!AdDetector::default().detect(&page));

    let selectors = DetectorSelectors {
        ad_timer: vec![".vp-ad-countdown".into()],
        ..DetectorSelectors::default()
    };
    let detector = AdDetector::new(selectors);
    assert_eq!(detector.classify(&page), Some(AdSignal::AdTimer));
}
