use std::cmp::Ordering;

/// Sort key for a question's `order` column: numeric prefix plus letter suffix.
///
/// `"12"` < `"12A"` < `"12B"` < `"13"`; orders without a numeric prefix sort
/// after every numeric one, lexically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    number: Option<u64>,
    suffix: String,
}

impl OrderKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
        let number = if digits.is_empty() {
            None
        } else {
            digits.parse::<u64>().ok()
        };
        let suffix = trimmed[digits.len()..].to_ascii_lowercase();
        Self { number, suffix }
    }

    pub fn number(&self) -> Option<u64> {
        self.number
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(left), Some(right)) => left
                .cmp(&right)
                .then_with(|| self.suffix.cmp(&other.suffix)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.suffix.cmp(&other.suffix),
        }
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
