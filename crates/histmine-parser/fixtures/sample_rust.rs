/// Sample Rust source for analyzer tests.

pub fn parse_range(input: &str) -> Result<(u32, u32), RangeError> {
    // Reject empty input early
    if input.is_empty() {
        return Err(RangeError::Empty);
    }

    let (lo, hi) = input.split_once("..").ok_or(RangeError::Syntax)?;
    let lo = parse_bound(lo)?;
    let hi = parse_bound(hi)?;

    if lo <= hi {
        Ok((lo, hi))
    } else {
        Err(RangeError::Inverted)
    }
}

fn parse_bound(text: &str) -> Result<u32, RangeError> {
    text.trim().parse().map_err(|_| RangeError::Syntax)
}

#[derive(Debug)]
pub enum RangeError {
    Empty,
    Syntax,
    Inverted,
}

pub struct RangeSet {
    ranges: Vec<(u32, u32)>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn contains(&self, value: u32) -> bool {
        self.ranges
            .iter()
            .any(|(lo, hi)| *lo <= value && value <= *hi)
    }
}
