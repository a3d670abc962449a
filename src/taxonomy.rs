// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Fixed waste taxonomy and the label-to-category resolver

use serde::{Deserialize, Serialize};

/// Waste categories supported by the sorting assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WasteCategory {
    Organic,
    Plastic,
    Paper,
    Metal,
    Glass,
    #[serde(rename = "E-waste")]
    EWaste,
    Unknown,
}

impl std::fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WasteCategory::Organic => "Organic",
            WasteCategory::Plastic => "Plastic",
            WasteCategory::Paper => "Paper",
            WasteCategory::Metal => "Metal",
            WasteCategory::Glass => "Glass",
            WasteCategory::EWaste => "E-waste",
            WasteCategory::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// One entry of the fixed taxonomy: a category, the lowercase keywords that
/// select it, and the disposal guidance shown to the user.
pub struct TaxonomyEntry {
    pub category: WasteCategory,
    pub keywords: &'static [&'static str],
    pub instructions: &'static str,
}

/// The fixed taxonomy, in declaration order. Order matters: when a label
/// matches keywords from more than one entry, the first entry wins.
pub const WASTE_TAXONOMY: &[TaxonomyEntry] = &[
    TaxonomyEntry {
        category: WasteCategory::Organic,
        keywords: &[
            "banana", "apple", "orange", "lemon", "fruit", "vegetable", "strawberry",
            "pineapple", "food", "corn", "broccoli", "cabbage", "bread", "meat", "egg",
        ],
        instructions: "Compost if possible, otherwise place in the organic/green bin. \
                       Remove any plastic stickers from fruits.",
    },
    TaxonomyEntry {
        category: WasteCategory::Plastic,
        keywords: &[
            "bottle", "water bottle", "plastic bag", "shampoo", "detergent",
            "container", "jug", "plastic",
        ],
        instructions: "Rinse and dry before recycling. Ensure it belongs to supported \
                       plastic types (usually #1, #2, #5).",
    },
    TaxonomyEntry {
        category: WasteCategory::Paper,
        keywords: &[
            "paper", "envelope", "carton", "cardboard", "box", "book", "magazine",
            "notebook", "newspaper",
        ],
        instructions: "Keep dry and flat. Remove any plastic lining or metal components. \
                       Do not recycle paper soiled with grease (like pizza boxes).",
    },
    TaxonomyEntry {
        category: WasteCategory::Metal,
        keywords: &[
            "can", "tin", "aluminum", "foil", "brass", "iron", "steel", "metal",
            "screw", "hammer",
        ],
        instructions: "Rinse and dry. Aluminum and steel cans are highly recyclable. \
                       Crumple foil into a ball (at least 2 inches wide).",
    },
    TaxonomyEntry {
        category: WasteCategory::Glass,
        keywords: &[
            "glass", "wine bottle", "beer bottle", "jar", "mason jar", "goblet", "beaker",
        ],
        instructions: "Rinse and remove caps. Dispose in the glass bin. Avoid mixing with \
                       ceramics or heat-resistant glass like Pyrex.",
    },
    TaxonomyEntry {
        category: WasteCategory::EWaste,
        keywords: &[
            "phone", "mobile", "computer", "laptop", "keyboard", "mouse", "battery",
            "remote", "electronics", "circuit", "tablet",
        ],
        instructions: "Must be taken to a specialized e-waste collection center. \
                       Do not throw in regular trash or recycling bins.",
    },
];

/// Fallback guidance when no taxonomy entry matches
pub const UNKNOWN_INSTRUCTIONS: &str =
    "Item not recognized. Please check your local waste authority guidelines or try \
     taking a clearer photo from a different angle.";

/// Result of one classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Resolved waste category
    pub category: WasteCategory,
    /// Model confidence (0.0 - 1.0), passed through unmodified
    pub confidence: f64,
    /// Raw label returned by the vision model
    pub label: String,
    /// Free-text reasoning from the model
    pub reasoning: String,
    /// Disposal guidance for the resolved category
    pub disposal_instructions: String,
}

/// Resolve a raw model label to a waste category with disposal guidance.
///
/// The label is lowercased and the taxonomy is scanned in declaration order;
/// the first entry with any keyword occurring as a substring wins. Labels
/// matching nothing resolve to [`WasteCategory::Unknown`] with the fallback
/// guidance. Confidence does not influence the match. Pure and deterministic.
pub fn resolve(raw_label: &str, confidence: f64) -> ClassificationResult {
    let normalized = raw_label.to_lowercase();

    let (category, instructions) = WASTE_TAXONOMY
        .iter()
        .find(|entry| entry.keywords.iter().any(|k| normalized.contains(k)))
        .map(|entry| (entry.category, entry.instructions))
        .unwrap_or((WasteCategory::Unknown, UNKNOWN_INSTRUCTIONS));

    ClassificationResult {
        category,
        confidence,
        label: raw_label.to_string(),
        reasoning: String::new(),
        disposal_instructions: instructions.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keyword_match() {
        let result = resolve("ripe banana peel", 0.92);
        assert_eq!(result.category, WasteCategory::Organic);
        assert_eq!(result.disposal_instructions, WASTE_TAXONOMY[0].instructions);
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.label, "ripe banana peel");
    }

    #[test]
    fn test_metal_match() {
        let result = resolve("crumpled aluminum foil", 0.81);
        assert_eq!(result.category, WasteCategory::Metal);
    }

    #[test]
    fn test_no_match_is_unknown() {
        let result = resolve("unidentified gray object", 0.40);
        assert_eq!(result.category, WasteCategory::Unknown);
        assert_eq!(result.disposal_instructions, UNKNOWN_INSTRUCTIONS);
    }

    #[test]
    fn test_rock_is_unknown() {
        let result = resolve("rock", 0.9);
        assert_eq!(result.category, WasteCategory::Unknown);
    }

    #[test]
    fn test_empty_label_is_unknown() {
        let result = resolve("", 0.5);
        assert_eq!(result.category, WasteCategory::Unknown);
        assert_eq!(result.disposal_instructions, UNKNOWN_INSTRUCTIONS);
    }

    #[test]
    fn test_first_declared_entry_wins() {
        // "bottle" (Plastic) and "can" (Metal) both match; Plastic is declared
        // first so it must win, regardless of keyword position in the label.
        let result = resolve("a can next to a bottle", 0.7);
        assert_eq!(result.category, WasteCategory::Plastic);

        // "glass" (Glass) vs "bottle" (Plastic): Plastic is declared earlier.
        let result = resolve("glass bottle", 0.7);
        assert_eq!(result.category, WasteCategory::Plastic);
    }

    #[test]
    fn test_case_insensitive() {
        let result = resolve("LAPTOP Computer", 0.88);
        assert_eq!(result.category, WasteCategory::EWaste);
    }

    #[test]
    fn test_confidence_passes_through() {
        for confidence in [0.0, 0.3, 0.5, 1.0] {
            let result = resolve("newspaper", confidence);
            assert_eq!(result.confidence, confidence);
            assert_eq!(result.category, WasteCategory::Paper);
        }
    }

    #[test]
    fn test_resolve_is_pure() {
        let a = resolve("shampoo bottle", 0.66);
        let b = resolve("shampoo bottle", 0.66);
        assert_eq!(a, b);
    }

    #[test]
    fn test_category_display_strings() {
        assert_eq!(WasteCategory::EWaste.to_string(), "E-waste");
        assert_eq!(WasteCategory::Organic.to_string(), "Organic");
        assert_eq!(
            serde_json::to_string(&WasteCategory::EWaste).unwrap(),
            "\"E-waste\""
        );
    }

    #[test]
    fn test_taxonomy_keywords_are_lowercase() {
        for entry in WASTE_TAXONOMY {
            for keyword in entry.keywords {
                assert_eq!(*keyword, keyword.to_lowercase());
            }
        }
    }
}
