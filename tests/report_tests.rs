/// Report layout and PDF output
mod common;

use common::*;
use mitti_mitra_api::aggregator::fallback_recommendations;
use mitti_mitra_api::models::*;
use mitti_mitra_api::report::{self, Align, Line, ReportDocument, Style};

fn crop_lines(doc: &ReportDocument) -> Vec<&Line> {
    doc.lines()
        .filter(|l| matches!(l.style, Style::CropLine | Style::TopCropLine))
        .collect()
}

/// Bullet lines directly following the crop line at `rank`.
fn bullets_after(doc: &ReportDocument, rank: usize) -> Vec<String> {
    let lines: Vec<&Line> = doc.lines().collect();
    let prefix = format!("{}. ", rank + 1);
    let start = lines
        .iter()
        .position(|l| {
            matches!(l.style, Style::CropLine | Style::TopCropLine) && l.text.starts_with(&prefix)
        })
        .expect("crop line present");

    lines[start + 1..]
        .iter()
        .take_while(|l| {
            !matches!(
                l.style,
                Style::CropLine | Style::TopCropLine | Style::Heading
            )
        })
        .filter(|l| l.text.starts_with("• "))
        .map(|l| l.text.clone())
        .collect()
}

#[cfg(test)]
mod highlighting_tests {
    use super::*;

    #[test]
    fn test_rank_zero_marked_in_fallback_set() {
        let doc = report::render(&result_with(fallback_recommendations(), true));

        let crops = crop_lines(&doc);
        assert_eq!(crops.len(), 3);
        assert_eq!(crops[0].style, Style::TopCropLine);
        assert_eq!(crops[0].text, "1. RICE (Suitability: N/A)");
        assert!(crops[1..].iter().all(|l| l.style == Style::CropLine));

        let markers: Vec<&Line> = doc
            .lines()
            .filter(|l| l.text == report::TOP_MARKER)
            .collect();
        assert_eq!(markers.len(), 1);
        assert!(doc.find(report::FALLBACK_NOTE).is_some());
    }

    #[test]
    fn test_rank_zero_marked_even_with_lowest_score() {
        let doc = report::render(&result_with(
            vec![
                rec("sorghum", 12.0, &[]),
                rec("cotton", 88.0, &[]),
                rec("maize", 95.0, &[]),
            ],
            false,
        ));

        let crops = crop_lines(&doc);
        assert_eq!(crops[0].text, "1. SORGHUM (12% Suitability)");
        assert_eq!(crops[0].style, Style::TopCropLine);
        assert_eq!(crops[2].style, Style::CropLine);

        let marker = doc.find(report::TOP_MARKER).unwrap();
        assert_eq!(marker, doc.find("SORGHUM").unwrap() + 1);
        assert!(doc.find(report::FALLBACK_NOTE).is_none());
    }
}

#[cfg(test)]
mod reasoning_tests {
    use super::*;

    #[test]
    fn test_empty_reasoning_renders_no_bullets() {
        let doc = report::render(&result_with(
            vec![
                rec(
                    "rice",
                    92.0,
                    &["high humidity favors rice", "clay loam holds water"],
                ),
                rec("maize", 75.0, &[]),
            ],
            false,
        ));

        assert_eq!(
            bullets_after(&doc, 0),
            vec!["• high humidity favors rice", "• clay loam holds water"]
        );
        assert!(bullets_after(&doc, 1).is_empty());
    }

    #[test]
    fn test_blank_reasons_are_skipped() {
        let doc = report::render(&result_with(vec![rec("jute", 70.0, &["", "   "])], false));
        assert!(bullets_after(&doc, 0).is_empty());
    }

    #[test]
    fn test_predicted_yield_is_not_a_bullet() {
        let mut crop = rec("rice", 92.0, &[]);
        crop.predicted_yield = Some(3.456);
        let doc = report::render(&result_with(vec![crop], false));

        assert!(doc.find("Expected yield: 3.46 tons/hectare").is_some());
        assert!(bullets_after(&doc, 0).is_empty());
    }
}

#[cfg(test)]
mod structure_tests {
    use super::*;

    #[test]
    fn test_end_to_end_document() {
        let doc = report::render(&result_with(rice_and_maize().recommendations, false));

        assert_eq!(doc.pages.len(), 2);

        let first: Vec<&Line> = doc.pages[0].lines().collect();
        assert_eq!(first[0].text, report::PRODUCT_NAME);
        assert_eq!(first[0].align, Align::Center);
        assert_eq!(first[1].text, report::SUBTITLE);

        let order = [
            "Farmer Input Summary",
            "Location: Hyderabad",
            "Soil pH: 6.5",
            "Nitrogen (N): 50",
            "Phosphorus (P): 40",
            "Potassium (K): 30",
            "Recommended Crops",
            "1. RICE (92% Suitability)",
            report::TOP_MARKER,
            "• high humidity favors rice",
            "2. MAIZE (75% Suitability)",
            "Weather Analysis",
            "Temperature: 28°C",
            "Humidity: 65%",
            "Rainfall: 120mm",
            report::WEATHER_ADVISORY,
            report::DISCLAIMER,
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| doc.find(needle).unwrap_or_else(|| panic!("missing {}", needle)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);

        let weather_page: Vec<&Line> = doc.pages[1].lines().collect();
        assert_eq!(weather_page[0].text, "Weather Analysis");

        let last = doc.lines().last().unwrap();
        assert_eq!(last.text, report::DISCLAIMER);
        assert_eq!(last.style, Style::Disclaimer);
        assert_eq!(last.align, Align::Center);
    }

    #[test]
    fn test_both_tip_shapes_render() {
        let mut result = result_with(rice_and_maize().recommendations, false);
        result.fertilizer_tips = vec![
            FertilizerTip::structured(Some("Potassium"), "MOP", "Soil potassium level is low"),
            FertilizerTip::structured(None, "NPK 10:26:26", "Soil nutrients are balanced"),
            FertilizerTip::plain("Soil is acidic (pH < 5.5). Apply lime."),
        ];

        let doc = report::render(&result);

        let heading = doc.find("Fertilizer Advice").unwrap();
        assert!(heading < doc.find("Weather Analysis").unwrap());
        assert!(doc.find("• Potassium: MOP - Soil potassium level is low").is_some());
        assert!(doc.find("• NPK 10:26:26 - Soil nutrients are balanced").is_some());
        assert!(doc.find("• Soil is acidic (pH < 5.5). Apply lime.").is_some());
    }

    #[test]
    fn test_no_tips_no_fertilizer_section() {
        let doc = report::render(&result_with(rice_and_maize().recommendations, false));
        assert!(doc.find("Fertilizer Advice").is_none());
    }
}

#[cfg(test)]
mod pdf_tests {
    use super::*;

    #[test]
    fn test_write_pdf_produces_document() {
        let doc = report::render(&result_with(rice_and_maize().recommendations, false));
        let bytes = report::write_pdf(&doc).unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
        let tail = String::from_utf8_lossy(&bytes[bytes.len().saturating_sub(64)..]).to_string();
        assert!(tail.contains("%%EOF"));
    }

    #[test]
    fn test_long_recommendation_list_overflows_pages() {
        let reason = "a fairly long line of reasoning that needs wrapping across the page width to fit";
        let many: Vec<CropRecommendation> = (0..60)
            .map(|i| rec(&format!("crop{}", i), 50.0, &[reason]))
            .collect();
        let doc = report::render(&result_with(many, false));

        let bytes = report::write_pdf(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_bold_line_wrapping_across_page_break() {
        // Long bold crop lines wrap into several chunks; with enough of them one
        // chunk has to start a fresh page mid-line.
        let long_name = "sorghum".repeat(20);
        let mut recs = vec![rec(&long_name, 88.0, &[])];
        recs.extend((0..40).map(|i| rec(&format!("{}{}", long_name, i), 40.0, &[])));
        let mut doc = report::render(&result_with(recs, false));
        for line in doc.pages[0]
            .blocks
            .iter_mut()
            .filter_map(|b| match b {
                report::Block::Line(line) => Some(line),
                report::Block::Gap(_) => None,
            })
        {
            if line.style == Style::CropLine {
                line.style = Style::TopCropLine;
            }
        }

        let bytes = report::write_pdf(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
