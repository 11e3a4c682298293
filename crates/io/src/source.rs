// Input file reading

use std::io::Read;
use std::path::Path;

use crate::error::ReportError;

/// Read a ledger export as text. Falls back to Windows-1252 when the bytes
/// are not valid UTF-8 (common for Excel-exported CSVs). A UTF-8 BOM is
/// dropped.
pub fn read_text(path: &Path) -> Result<String, ReportError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(decode(bytes))
}

fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => match s.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => s,
        },
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode("uid,desc\n1,CAFÉ\n".as_bytes().to_vec()), "uid,desc\n1,CAFÉ\n");
    }

    #[test]
    fn bom_is_dropped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"uid,date");
        assert_eq!(decode(bytes), "uid,date");
    }

    #[test]
    fn windows_1252_fallback() {
        // "CAF\xC9" is CAFÉ in Windows-1252 and invalid UTF-8
        assert_eq!(decode(b"1,CAF\xC9".to_vec()), "1,CAFÉ");
    }

    #[test]
    fn missing_file() {
        assert!(matches!(read_text(Path::new("/nonexistent/gl.csv")), Err(ReportError::Io(_))));
    }
}
