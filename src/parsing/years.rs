use regex::Regex;

#[derive(Debug, Clone)]
pub struct YearTokens {
    pattern: Regex,
}

impl YearTokens {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)")?,
        })
    }

    pub fn find(&self, column: &str) -> Option<i64> {
        self.pattern
            .captures(column)
            .and_then(|captures| captures.get(1))
            .and_then(|year| year.as_str().parse::<i64>().ok())
    }
}
