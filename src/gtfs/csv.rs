//! Quoted-CSV row tokenizer for the GTFS reference tables.
//!
//! GTFS feeds in the wild mix `\n`, `\r\n` and bare `\r` line endings and
//! quote fields containing commas, so the tokenizer handles quoting itself
//! instead of assuming clean input. Malformed quoting never errors; an
//! unterminated quote simply runs to the end of the input.

/// Splits `text` into logical CSV rows, invoking `f` once per row with the
/// ordered field values.
///
/// Supported syntax: `,` field separator; double-quoted fields; `""` inside a
/// quoted field for a literal quote; `\n`, `\r\n` and bare `\r` as row
/// boundaries outside quotes. A trailing row without a line break is still
/// emitted. Wholly empty lines are skipped. BOM stripping is the caller's
/// concern.
pub fn for_each_row(text: &str, mut f: impl FnMut(&[String])) {
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut row_has_data = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                row_has_data = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                row_has_data = true;
            }
            '\n' | '\r' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if row_has_data || !field.is_empty() {
                    fields.push(std::mem::take(&mut field));
                    f(&fields);
                }
                fields.clear();
                row_has_data = false;
            }
            _ => {
                field.push(c);
                row_has_data = true;
            }
        }
    }

    // Trailing row without a terminating line break.
    if row_has_data || !field.is_empty() {
        fields.push(field);
        f(&fields);
    }
}

/// Collects all rows into a vector. Convenience for tests and small tables.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for_each_row(text, |fields| rows.push(fields.to_vec()));
    rows
}
