/// One step of a CSS-style filter chain. Amounts are fractions (1.0 = 100%).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    Grayscale(f32),
    Sepia(f32),
    Saturate(f32),
    Contrast(f32),
    Brightness(f32),
}

impl FilterOp {
    pub fn css(&self) -> String {
        let (function, amount) = match self {
            Self::Grayscale(amount) => ("grayscale", amount),
            Self::Sepia(amount) => ("sepia", amount),
            Self::Saturate(amount) => ("saturate", amount),
            Self::Contrast(amount) => ("contrast", amount),
            Self::Brightness(amount) => ("brightness", amount),
        };
        format!("{function}({}%)", (amount * 100.0).round() as i64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterPreset {
    pub name: &'static str,
    pub ops: &'static [FilterOp],
}

impl FilterPreset {
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn css(&self) -> String {
        if self.ops.is_empty() {
            return "none".to_string();
        }
        self.ops
            .iter()
            .map(FilterOp::css)
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Lowercased name used in export file names.
    pub fn slug(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

pub const IDENTITY_FILTER: FilterPreset = FilterPreset {
    name: "Original",
    ops: &[],
};

pub const FILTERS: &[FilterPreset] = &[
    IDENTITY_FILTER,
    FilterPreset {
        name: "Mono",
        ops: &[FilterOp::Grayscale(1.0)],
    },
    FilterPreset {
        name: "Sepia",
        ops: &[FilterOp::Sepia(1.0)],
    },
    FilterPreset {
        name: "Retro",
        ops: &[
            FilterOp::Sepia(0.5),
            FilterOp::Contrast(1.1),
            FilterOp::Saturate(0.8),
        ],
    },
    FilterPreset {
        name: "Vivid",
        ops: &[FilterOp::Saturate(1.5), FilterOp::Contrast(1.1)],
    },
    FilterPreset {
        name: "Soft",
        ops: &[
            FilterOp::Brightness(1.1),
            FilterOp::Contrast(0.9),
            FilterOp::Saturate(0.9),
        ],
    },
    FilterPreset {
        name: "Dramatic",
        ops: &[FilterOp::Contrast(1.4), FilterOp::Brightness(0.9)],
    },
];

pub fn find_filter(name: &str) -> Option<&'static FilterPreset> {
    let wanted = name.trim();
    FILTERS
        .iter()
        .find(|filter| filter.name.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::{find_filter, FILTERS, IDENTITY_FILTER};

    #[test]
    fn css_strings_match_display_styles() {
        let styles: Vec<(&str, String)> = FILTERS
            .iter()
            .map(|filter| (filter.name, filter.css()))
            .collect();
        assert_eq!(styles[0], ("Original", "none".to_string()));
        assert_eq!(styles[1], ("Mono", "grayscale(100%)".to_string()));
        assert_eq!(
            styles[3],
            (
                "Retro",
                "sepia(50%) contrast(110%) saturate(80%)".to_string()
            )
        );
        assert_eq!(
            styles[5],
            (
                "Soft",
                "brightness(110%) contrast(90%) saturate(90%)".to_string()
            )
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_filter("vivid").map(|f| f.name), Some("Vivid"));
        assert_eq!(find_filter(" DRAMATIC ").map(|f| f.name), Some("Dramatic"));
        assert!(find_filter("lomo").is_none());
    }

    #[test]
    fn identity_is_first_and_empty() {
        assert_eq!(FILTERS[0], IDENTITY_FILTER);
        assert!(IDENTITY_FILTER.is_identity());
        assert_eq!(IDENTITY_FILTER.slug(), "original");
    }
}
