use std::io::Read;

use serde::Deserialize;

/// One scripted inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptLine {
    pub identity: String,
    #[serde(default)]
    pub text: String,
}

/// Reads `identity,text` rows from a CSV conversation script.
///
/// Fields are trimmed and short rows are accepted, so a row with only an
/// identity replays as an empty message.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows; a malformed row yields an error and reading
    /// continues with the next one.
    pub fn lines(self) -> impl Iterator<Item = Result<ScriptLine, csv::Error>> {
        self.reader.into_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_keeps_quoted_commas() {
        let data = "identity, text\nalice, hi\nalice,\"$2 to 0772123456, please\"\nbob,\n";
        let lines: Vec<ScriptLine> = ScriptReader::new(data.as_bytes())
            .lines()
            .collect::<Result<_, _>>()
            .expect("script parses");

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].identity, "alice");
        assert_eq!(lines[1].text, "$2 to 0772123456, please");
        assert_eq!(lines[2].text, "");
    }

    #[test]
    fn missing_identity_column_is_an_error() {
        let data = "who, text\nalice, hi\n";
        let results: Vec<_> = ScriptReader::new(data.as_bytes()).lines().collect();
        assert!(results[0].is_err());
    }
}
