#![forbid(unsafe_code)]

pub mod items;

pub use items::{ItemError, RawSectionItem, TemplateItem, normalize_items, validate_items};

pub mod name {
    /// Trims a display name and rejects blank input.
    pub fn clean_name(raw: &str) -> Result<String, BlankName> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BlankName);
        }
        Ok(trimmed.to_string())
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BlankName;

    impl std::fmt::Display for BlankName {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "name must not be empty")
        }
    }

    impl std::error::Error for BlankName {}
}

pub mod strategy {
    /// What happens to a deleted section's descendants.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum DeleteStrategy {
        /// Reattach direct children to the deleted section's parent.
        LiftChildren,
        /// Remove the section together with its entire subtree.
        Cascade,
    }

    impl DeleteStrategy {
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::LiftChildren => "lift_children",
                Self::Cascade => "cascade",
            }
        }
    }

    impl std::str::FromStr for DeleteStrategy {
        type Err = InvalidStrategy;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            match value {
                "lift_children" => Ok(Self::LiftChildren),
                "cascade" => Ok(Self::Cascade),
                _ => Err(InvalidStrategy),
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InvalidStrategy;

    impl std::fmt::Display for InvalidStrategy {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "strategy must be lift_children or cascade")
        }
    }

    impl std::error::Error for InvalidStrategy {}
}

#[cfg(test)]
mod tests {
    use super::name::{BlankName, clean_name};
    use super::strategy::DeleteStrategy;

    #[test]
    fn clean_name_trims_surrounding_whitespace() {
        assert_eq!(clean_name("  Chapter 1 ").as_deref(), Ok("Chapter 1"));
    }

    #[test]
    fn clean_name_rejects_blank_input() {
        assert_eq!(clean_name("   "), Err(BlankName));
        assert_eq!(clean_name(""), Err(BlankName));
    }

    #[test]
    fn strategy_parses_both_forms() {
        assert_eq!(
            "lift_children".parse::<DeleteStrategy>(),
            Ok(DeleteStrategy::LiftChildren)
        );
        assert_eq!("cascade".parse::<DeleteStrategy>(), Ok(DeleteStrategy::Cascade));
        assert!("drop".parse::<DeleteStrategy>().is_err());
    }
}
