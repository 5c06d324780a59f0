use std::path::Path;

use encoding_rs::SHIFT_JIS;

pub fn sjis(text: &str) -> Vec<u8> {
    SHIFT_JIS.encode(text).0.into_owned()
}

pub fn write_sjis_file(path: &Path, lines: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend(sjis(line));
        bytes.extend_from_slice(b"\r\n");
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
