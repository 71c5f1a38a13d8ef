//! Rule-based fertilizer advice derived from soil chemistry alone.
//!
//! Used whenever the prediction engine does not supply its own tips,
//! including on the fallback path.

use crate::models::{FertilizerTip, SoilInput};

pub const LOW_NITROGEN: f64 = 50.0;
pub const LOW_PHOSPHORUS: f64 = 40.0;
pub const LOW_POTASSIUM: f64 = 40.0;
pub const ACIDIC_PH: f64 = 5.5;
pub const ALKALINE_PH: f64 = 8.0;

/// Nutrient tips first (structured), then pH amendments (plain).
pub fn recommend(soil: &SoilInput) -> Vec<FertilizerTip> {
    let mut tips = Vec::new();

    if soil.n < LOW_NITROGEN {
        tips.push(FertilizerTip::structured(
            Some("Nitrogen"),
            "Urea",
            "Soil nitrogen level is low",
        ));
    }
    if soil.p < LOW_PHOSPHORUS {
        tips.push(FertilizerTip::structured(
            Some("Phosphorus"),
            "DAP",
            "Soil phosphorus level is low",
        ));
    }
    if soil.k < LOW_POTASSIUM {
        tips.push(FertilizerTip::structured(
            Some("Potassium"),
            "MOP",
            "Soil potassium level is low",
        ));
    }
    if tips.is_empty() {
        tips.push(FertilizerTip::structured(
            None,
            "NPK 10:26:26",
            "Soil nutrients are balanced",
        ));
    }

    if soil.ph < ACIDIC_PH {
        tips.push(FertilizerTip::plain(
            "Soil is acidic (pH < 5.5). Apply lime (calcium carbonate) to neutralize acidity.",
        ));
    } else if soil.ph > ALKALINE_PH {
        tips.push(FertilizerTip::plain(
            "Soil is alkaline (pH > 8.0). Apply gypsum or iron sulfate to lower pH.",
        ));
    }

    tips
}
