//! Offline answers used when the analysis service can't be reached.
//!
//! Rules are checked in the order of [`RULES`]; the first whose predicate
//! matches the lower-cased question produces the reply. Predicates are
//! plain substring tests and stay deliberately broad: a loosely related
//! topic answer beats the generic one.

use tracing::debug;
use crate::state::{ImageRef, Message};

/// A precomputed figure shipped with the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Figure {
    pub file: &'static str,
    pub caption: &'static str,
}

/// What a rule produces before it is turned into a [`Message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedReply {
    pub text: String,
    pub figure: Option<Figure>,
}

impl CannedReply {
    fn new(text: impl Into<String>, figure: Option<Figure>) -> Self {
        Self {
            text: text.into(),
            figure,
        }
    }
}

pub struct FallbackRule {
    pub name: &'static str,
    pub predicate: fn(&str) -> bool,
    pub produce: fn(&str) -> CannedReply,
}

const TEMPERATURE_TERMS: &[&str] = &["temperature", "temp", "warm", "heat", "thermal", "sst", "hot", "cold"];
const SALINITY_TERMS: &[&str] = &["salinity", "salt", "psu", "fresh water", "freshwater"];
const PROFILE_TERMS: &[&str] = &["profile", "depth", "deep", "vertical", "thermocline", "mixed layer"];
const ARGO_TERMS: &[&str] = &["argo", "float", "buoy"];
const SPATIAL_TERMS: &[&str] = &["map", "3d", "spatial", "distribution", "scatter"];
const ARABIAN_SEA_TERMS: &[&str] = &["arabian sea", "mumbai", "bombay", "goa", "kochi", "karachi", "oman"];
const BAY_OF_BENGAL_TERMS: &[&str] = &["bay of bengal", "chennai", "kolkata", "visakhapatnam", "bengal"];
const INDIAN_OCEAN_TERMS: &[&str] = &["indian ocean"];

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// Ordered rule table; earlier entries win.
pub static RULES: &[FallbackRule] = &[
    FallbackRule {
        name: "indian_ocean_temperature",
        predicate: |t| mentions_any(t, INDIAN_OCEAN_TERMS) && mentions_any(t, TEMPERATURE_TERMS),
        produce: |_| {
            CannedReply::new(
                "Indian Ocean temperature overview (offline summary)\n\
                 \n\
                 Surface waters north of the equator typically sit between 26 and 30 °C, \
                 with the warmest readings in the Arabian Sea and Bay of Bengal before the \
                 summer monsoon. Temperature falls steeply through a thermocline at roughly \
                 50-150 m and reaches 2-4 °C below 1,500 m. The basin has been one of the \
                 fastest-warming oceans over recent decades, and the monsoon and the Indian \
                 Ocean Dipole drive most of the year-to-year variation seen in Argo profiles.",
                Some(Figure {
                    file: "indian_ocean_temperature.png",
                    caption: "Indian Ocean surface temperature climatology",
                }),
            )
        },
    },
    FallbackRule {
        name: "arabian_sea",
        predicate: |t| mentions_any(t, ARABIAN_SEA_TERMS),
        produce: |_| {
            CannedReply::new(
                "Arabian Sea conditions (offline summary)\n\
                 \n\
                 The Arabian Sea is warm and salty: surface salinity is usually 36-37 PSU \
                 because evaporation exceeds rainfall. Off the Mumbai coast surface \
                 temperatures run 27-30 °C, cooling during the southwest monsoon when \
                 upwelling along the western margin brings colder, nutrient-rich water up. \
                 A pronounced oxygen minimum zone lies between about 150 and 1,000 m.",
                Some(Figure {
                    file: "arabian_sea_profile.png",
                    caption: "Typical Arabian Sea temperature and salinity profile",
                }),
            )
        },
    },
    FallbackRule {
        name: "bay_of_bengal",
        predicate: |t| mentions_any(t, BAY_OF_BENGAL_TERMS),
        produce: |_| {
            CannedReply::new(
                "Bay of Bengal conditions (offline summary)\n\
                 \n\
                 Heavy monsoon rain and river discharge from the Ganges-Brahmaputra system \
                 make the Bay of Bengal much fresher than the Arabian Sea, with surface \
                 salinity often below 33 PSU in the north. The fresh layer forms a strong, \
                 shallow halocline that keeps surface temperatures near 28-30 °C and \
                 favours cyclone development after the monsoon.",
                Some(Figure {
                    file: "bay_of_bengal_salinity.png",
                    caption: "Bay of Bengal surface salinity",
                }),
            )
        },
    },
    FallbackRule {
        name: "salinity",
        predicate: |t| mentions_any(t, SALINITY_TERMS),
        produce: |_| {
            CannedReply::new(
                "Ocean salinity (offline summary)\n\
                 \n\
                 Open-ocean salinity in the region ranges from about 33 to 37 PSU. It is \
                 highest where evaporation dominates (Arabian Sea, Red Sea outflow) and \
                 lowest near large river mouths and under heavy rainfall. Temperature and \
                 salinity together set seawater density, so a T-S diagram is the usual way \
                 to tell water masses apart.",
                Some(Figure {
                    file: "ts_diagram.png",
                    caption: "Temperature-salinity diagram of regional water masses",
                }),
            )
        },
    },
    FallbackRule {
        name: "depth_profile",
        predicate: |t| mentions_any(t, PROFILE_TERMS),
        produce: |_| {
            CannedReply::new(
                "Vertical ocean profiles (offline summary)\n\
                 \n\
                 A typical tropical profile has a warm mixed layer of 20-80 m, a thermocline \
                 where temperature drops by 10-15 °C over a few hundred metres, and a cold, \
                 stable deep layer. Argo floats sample this structure from 2,000 m to the \
                 surface roughly every ten days.",
                Some(Figure {
                    file: "temperature_profile.png",
                    caption: "Representative temperature profile with depth",
                }),
            )
        },
    },
    FallbackRule {
        name: "argo_floats",
        predicate: |t| mentions_any(t, ARGO_TERMS),
        produce: |_| {
            CannedReply::new(
                "About Argo floats (offline summary)\n\
                 \n\
                 Argo is a global array of nearly 4,000 autonomous profiling floats. Each \
                 one drifts at about 1,000 m, dives to 2,000 m, then rises to the surface \
                 measuring temperature, salinity and pressure before relaying its data by \
                 satellite. The FloatChat database is built from these profiles.",
                None,
            )
        },
    },
    FallbackRule {
        name: "spatial_view",
        predicate: |t| mentions_any(t, SPATIAL_TERMS),
        produce: |_| {
            CannedReply::new(
                "Spatial views (offline summary)\n\
                 \n\
                 Maps and 3D views need live data from the analysis service, which isn't \
                 reachable right now. The figure below shows where Argo measurements in \
                 the database were collected.",
                Some(Figure {
                    file: "float_coverage_map.png",
                    caption: "Argo float coverage in the northern Indian Ocean",
                }),
            )
        },
    },
    FallbackRule {
        name: "temperature",
        predicate: |t| mentions_any(t, TEMPERATURE_TERMS),
        produce: |_| {
            CannedReply::new(
                "Ocean temperature (offline summary)\n\
                 \n\
                 Sea surface temperatures across the northern Indian Ocean usually range \
                 from 24 to 30 °C depending on season and monsoon phase. Below the mixed \
                 layer, temperature drops quickly through the thermocline and stays \
                 between 2 and 5 °C in deep water.",
                Some(Figure {
                    file: "temperature_overview.png",
                    caption: "Seasonal sea surface temperature range",
                }),
            )
        },
    },
    FallbackRule {
        name: "indian_ocean",
        predicate: |t| mentions_any(t, INDIAN_OCEAN_TERMS),
        produce: |_| {
            CannedReply::new(
                "Indian Ocean overview (offline summary)\n\
                 \n\
                 The Indian Ocean is the third-largest ocean basin and the only one whose \
                 upper circulation reverses with the seasons, driven by the monsoon winds. \
                 Its northern half splits into the salty Arabian Sea and the fresher Bay \
                 of Bengal.",
                None,
            )
        },
    },
];

fn generic_reply(question: &str) -> CannedReply {
    CannedReply::new(
        format!(
            "FloatChat is currently limited and can't analyse \"{}\" right now.\n\
             \n\
             Available data covers the Arabian Sea, the Bay of Bengal and the wider Indian \
             Ocean, with temperature, salinity and depth from Argo floats. Questions that \
             work well:\n\
             • \"Show the temperature profile near Mumbai\"\n\
             • \"Salinity in the Bay of Bengal\"\n\
             • \"Temperature trends in the Indian Ocean\"",
            question.trim()
        ),
        None,
    )
}

/// Deterministic local responder
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    assets_dir: String,
}

impl FallbackResponder {
    pub fn new(assets_dir: &str) -> Self {
        Self {
            assets_dir: assets_dir.trim_end_matches(['/', '\\']).to_string(),
        }
    }

    /// Build the offline reply for `raw_text`, annotated with `diagnostic`
    pub fn respond(&self, raw_text: &str, diagnostic: &str) -> Message {
        let lowered = raw_text.to_lowercase();

        let reply = match first_match(&lowered) {
            Some(rule) => {
                debug!(rule = rule.name, "fallback rule matched");
                (rule.produce)(&lowered)
            }
            None => {
                debug!("no fallback rule matched, using generic reply");
                generic_reply(raw_text)
            }
        };

        let images = reply
            .figure
            .map(|figure| vec![self.figure_ref(figure)])
            .unwrap_or_default();

        Message::assistant(reply.text, images).with_diagnostic(diagnostic)
    }

    fn figure_ref(&self, figure: Figure) -> ImageRef {
        ImageRef::new(format!("{}/{}", self.assets_dir, figure.file), figure.caption)
    }
}

/// First rule whose predicate accepts the lowercased question
fn first_match(lowered: &str) -> Option<&'static FallbackRule> {
    RULES.iter().find(|rule| (rule.predicate)(lowered))
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self::new("assets/fallback")
    }
}
