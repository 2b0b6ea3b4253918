//! Substitution engine for `$name$` variable references

/// Opens and closes a variable reference
pub const DELIMITER: char = '$';

/// Upper bound on substitutions in a single string; self-referencing values
/// would otherwise expand forever
pub const MAX_PASSES: usize = 1024;

/// Expand every `$name$` reference in `input`
///
/// Each pass replaces the first delimiter pair with the value returned by
/// `lookup` and rescans from the start, so references introduced by a value
/// are expanded too, left to right.
pub fn substitute(
    input: &str,
    mut lookup: impl FnMut(&str) -> String,
) -> Result<String, SubstitutionError> {
    let mut result = input.to_string();

    for _ in 0..MAX_PASSES {
        let Some(start) = result.find(DELIMITER) else {
            return Ok(result);
        };
        let name_start = start + DELIMITER.len_utf8();
        let Some(name_len) = result[name_start..].find(DELIMITER) else {
            return Err(SubstitutionError::Unterminated(result));
        };
        let end = name_start + name_len;

        let value = lookup(&result[name_start..end]);
        result.replace_range(start..end + DELIMITER.len_utf8(), &value);
    }

    if result.contains(DELIMITER) {
        return Err(SubstitutionError::MaxPassesExceeded(input.to_string()));
    }
    Ok(result)
}

/// Errors that stop substitution of a string
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubstitutionError {
    /// A `$` without a closing partner; carries the text expanded so far
    #[error("Unterminated variable delimiter in: {0}")]
    Unterminated(String),

    #[error("Maximum substitution passes exceeded for: {0}")]
    MaxPassesExceeded(String),
}
