use std::fmt;

/// A single input symbol handed to the parser.
///
/// The payload is opaque to the chart engine; terminals only look at its text
/// (see `Terminal::matches`), so any `E: AsRef<str>` can be parsed.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Token<E> {
    pub payload: E,
}

impl<E> Token<E> {
    pub fn new(payload: E) -> Self {
        Token { payload }
    }
}

impl<E: AsRef<str>> Token<E> {
    pub fn text(&self) -> &str {
        self.payload.as_ref()
    }
}

impl<E: AsRef<str>> fmt::Display for Token<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "'{}'",
            self.text().replace('\n', "\\n").replace('\t', "\\t")
        )
    }
}

pub fn tokenize<T: AsRef<str>>(words: &[T]) -> Vec<Token<String>> {
    words
        .iter()
        .map(|word| Token::new(word.as_ref().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_words() {
        //setup
        let words = ["the", "boy", "left"];

        //exercise
        let tokens = tokenize(&words);

        //verify
        assert_eq!(tokens_string(&tokens), "\n'the'\n'boy'\n'left'");
    }

    #[test]
    fn display_escapes_whitespace() {
        //setup
        let token = Token::new("a\tb\n");

        //exercise
        let res = format!("{}", token);

        //verify
        assert_eq!(res, "'a\\tb\\n'");
    }

    fn tokens_string(tokens: &[Token<String>]) -> String {
        let mut res = String::new();

        for token in tokens {
            res = format!("{}\n{}", res, token)
        }
        res
    }
}
