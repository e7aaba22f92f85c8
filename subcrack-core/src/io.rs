use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::alphabet::Alphabet;

/// Reads a whole text file into memory.
pub fn read_text<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	fs::read_to_string(filename)
}

/// Drops every character that is not part of `alphabet`.
///
/// - With `lowercase`, characters are lower-cased before the check
/// - Runs of whitespace collapse to a single space when the alphabet has one,
///   so line breaks in a corpus read like word breaks
pub fn filter_to_alphabet(text: &str, alphabet: &Alphabet, lowercase: bool) -> String {
	let keeps_space = alphabet.contains(' ');
	let mut filtered = String::with_capacity(text.len());
	let mut last_was_space = false;

	for c in text.chars() {
		let c = if c.is_whitespace() && keeps_space { ' ' } else { c };
		let candidates: Vec<char> = if lowercase { c.to_lowercase().collect() } else { vec![c] };
		for c in candidates {
			if !alphabet.contains(c) {
				continue;
			}
			if c == ' ' && keeps_space && last_was_space {
				continue;
			}
			last_was_space = c == ' ';
			filtered.push(c);
		}
	}

	filtered
}

/// Path of a file derived from `input_path`, in the same directory, with
/// the extension replaced.
///
/// `data/corpus.txt` + `"2gram.bin"` → `data/corpus.2gram.bin`
pub fn build_output_path<P: AsRef<Path>>(input_path: P, extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();
	let stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "input path has no file name"))?;

	let mut name = stem.to_os_string();
	name.push(".");
	name.push(extension);
	Ok(input_path.with_file_name(name))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filter_keeps_alphabet_only() {
		let alphabet = Alphabet::lowercase_latin();
		assert_eq!(filter_to_alphabet("Hello,\n  World! 42", &alphabet, true), "hello world ");
		assert_eq!(filter_to_alphabet("Hello", &alphabet, false), "ello");
	}

	#[test]
	fn filter_without_space_symbol() {
		let alphabet = Alphabet::new("ab").unwrap();
		assert_eq!(filter_to_alphabet("a b\tBA", &alphabet, true), "abba");
	}

	#[test]
	fn output_path_replaces_extension() {
		let path = build_output_path("data/corpus.txt", "3gram.bin").unwrap();
		assert_eq!(path, PathBuf::from("data/corpus.3gram.bin"));
		assert!(build_output_path("", "bin").is_err());
	}
}
