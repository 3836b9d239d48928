use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Asymptotic growth classes in their fixed total order; the derived `Ord`
/// follows declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrowthClass {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Quadratic,
    Cubic,
    Polynomial,
    Exponential,
    Factorial,
}

impl GrowthClass {
    pub const ALL: [GrowthClass; 9] = [
        GrowthClass::Constant,
        GrowthClass::Logarithmic,
        GrowthClass::Linear,
        GrowthClass::Linearithmic,
        GrowthClass::Quadratic,
        GrowthClass::Cubic,
        GrowthClass::Polynomial,
        GrowthClass::Exponential,
        GrowthClass::Factorial,
    ];

    pub fn notation(&self) -> &'static str {
        match self {
            GrowthClass::Constant => "O(1)",
            GrowthClass::Logarithmic => "O(log n)",
            GrowthClass::Linear => "O(n)",
            GrowthClass::Linearithmic => "O(n log n)",
            GrowthClass::Quadratic => "O(n²)",
            GrowthClass::Cubic => "O(n³)",
            GrowthClass::Polynomial => "O(n^k)",
            GrowthClass::Exponential => "O(2^n)",
            GrowthClass::Factorial => "O(n!)",
        }
    }

    /// Class implied by loop nesting alone.
    pub fn from_loop_depth(depth: usize) -> Self {
        match depth {
            0 => GrowthClass::Constant,
            1 => GrowthClass::Linear,
            2 => GrowthClass::Quadratic,
            3 => GrowthClass::Cubic,
            _ => GrowthClass::Polynomial,
        }
    }
}

impl fmt::Display for GrowthClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notation())
    }
}

impl FromStr for GrowthClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        GrowthClass::ALL
            .iter()
            .copied()
            .find(|class| class.notation() == trimmed)
            .or(match trimmed {
                "O(n^2)" => Some(GrowthClass::Quadratic),
                "O(n^3)" => Some(GrowthClass::Cubic),
                _ => None,
            })
            .ok_or_else(|| format!("unknown growth class '{trimmed}'"))
    }
}

impl Serialize for GrowthClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.notation())
    }
}

impl<'de> Deserialize<'de> for GrowthClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter writing `None` as `"Unknown"`.
pub(crate) mod overall {
    use super::GrowthClass;
    use serde::{Deserialize, Deserializer, Serializer};

    const UNKNOWN: &str = "Unknown";

    pub fn serialize<S: Serializer>(
        value: &Option<GrowthClass>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(class) => serializer.serialize_str(class.notation()),
            None => serializer.serialize_str(UNKNOWN),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<GrowthClass>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == UNKNOWN {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        let mut sorted = GrowthClass::ALL;
        sorted.sort();
        assert_eq!(sorted, GrowthClass::ALL);
        assert!(GrowthClass::Cubic > GrowthClass::Linear);
        assert!(GrowthClass::Linear > GrowthClass::Constant);
        assert!(GrowthClass::Factorial > GrowthClass::Exponential);
    }

    #[test]
    fn test_notation_parses_back() {
        for class in GrowthClass::ALL {
            assert_eq!(class.notation().parse::<GrowthClass>(), Ok(class));
        }
        assert_eq!("O(n^2)".parse::<GrowthClass>(), Ok(GrowthClass::Quadratic));
        assert!("O(n^2.5)".parse::<GrowthClass>().is_err());
    }

    #[test]
    fn test_from_loop_depth() {
        assert_eq!(GrowthClass::from_loop_depth(0), GrowthClass::Constant);
        assert_eq!(GrowthClass::from_loop_depth(3), GrowthClass::Cubic);
        assert_eq!(GrowthClass::from_loop_depth(7), GrowthClass::Polynomial);
    }
}
