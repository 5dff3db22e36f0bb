use crate::Response;

/// Characters of a keyword that player input must share to trigger it.
pub const KEYWORD_MATCH_LEN: usize = 4;

pub fn normalize_keyword(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct Keyword {
    keyword: String,
    response: Response,
}

impl Keyword {
    pub fn new(keyword: &str, response: Response) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            response,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Case-insensitive comparison on the first `min(len, 4)` characters.
    /// An empty keyword only accepts empty input.
    pub fn matches(&self, input: &str) -> bool {
        let test_len = self.keyword.chars().count().min(KEYWORD_MATCH_LEN);
        if test_len == 0 {
            return input.is_empty();
        }

        let wanted = self.keyword.chars().take(test_len);
        let mut given = input.chars().flat_map(char::to_lowercase);
        for expected in wanted {
            match given.next() {
                Some(actual) if actual == expected => {}
                _ => return false,
            }
        }
        true
    }
}
