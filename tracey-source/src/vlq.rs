//! Base64 VLQ マッピングのデコード

use crate::Result;

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// VLQの継続ビット
const VLQ_CONTINUATION: i64 = 0b10_0000;
/// VLQの値ビット
const VLQ_MASK: i64 = 0b01_1111;

/// 1つのマッピングセグメント（すべて0始まりの絶対値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_column: u32,
    /// `sources` 配列のインデックス（元ソースを持たないセグメントは `None`）
    pub source: Option<u32>,
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<u32>,
}

fn base64_value(c: u8) -> Option<i64> {
    BASE64_CHARS.iter().position(|&b| b == c).map(|p| p as i64)
}

/// 1つのセグメント（例: "AAgBC"）を相対値の列にデコードする
pub fn decode_segment(segment: &str) -> Result<Vec<i64>> {
    let mut values = Vec::new();
    let mut value = 0i64;
    let mut shift = 0u32;

    for c in segment.bytes() {
        let digit = base64_value(c)
            .ok_or_else(|| anyhow::anyhow!("Invalid base64 character '{}' in segment '{}'", c as char, segment))?;

        value += (digit & VLQ_MASK) << shift;

        if digit & VLQ_CONTINUATION != 0 {
            shift += 5;
            if shift > 60 {
                anyhow::bail!("VLQ value overflow in segment '{}'", segment);
            }
        } else {
            // 最下位ビットが符号
            let negative = value & 1 == 1;
            let magnitude = value >> 1;
            values.push(if negative { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }

    if shift != 0 {
        anyhow::bail!("Unterminated VLQ value in segment '{}'", segment);
    }

    Ok(values)
}

fn apply(base: &mut i64, delta: i64) -> Result<u32> {
    *base += delta;
    u32::try_from(*base).map_err(|_| anyhow::anyhow!("Negative mapping value {}", base))
}

/// `mappings` 文字列全体を生成ファイルの行ごとのセグメント列にデコードする
///
/// 生成列は行ごとにリセットされ、それ以外のフィールドは全体を通して累積する。
pub fn decode_mappings(mappings: &str) -> Result<Vec<Vec<Mapping>>> {
    let mut lines = Vec::new();

    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut name = 0i64;

    for line in mappings.split(';') {
        let mut generated_column = 0i64;
        let mut segments = Vec::new();

        for segment in line.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_segment(segment)?;

            let mut mapping = Mapping {
                generated_column: 0,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };

            match fields.len() {
                1 | 4 | 5 => {}
                n => anyhow::bail!("Unexpected segment length {} in '{}'", n, segment),
            }

            mapping.generated_column = apply(&mut generated_column, fields[0])?;

            if fields.len() >= 4 {
                mapping.source = Some(apply(&mut source, fields[1])?);
                mapping.original_line = apply(&mut original_line, fields[2])?;
                mapping.original_column = apply(&mut original_column, fields[3])?;
            }
            if fields.len() == 5 {
                mapping.name = Some(apply(&mut name, fields[4])?);
            }

            segments.push(mapping);
        }

        // 生成列の昇順で検索できるようにする
        segments.sort_by_key(|m| m.generated_column);
        lines.push(segments);
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("AAAA").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(decode_segment("AACD").unwrap(), vec![0, 0, 1, -1]);
        // 継続ビット付きの値
        assert_eq!(decode_segment("gB").unwrap(), vec![16]);
        assert_eq!(decode_segment("AAGA").unwrap(), vec![0, 0, 3, 0]);
    }

    #[test]
    fn test_decode_segment_invalid() {
        assert!(decode_segment("A!").is_err());
        // 継続ビットで終わっている
        assert!(decode_segment("g").is_err());
    }

    #[test]
    fn test_decode_mappings_accumulates() {
        let lines = decode_mappings("AAAA,IAAI;AACA").unwrap();
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0][1].generated_column, 4);
        assert_eq!(lines[0][1].original_column, 4);

        // 2行目: 生成列はリセット、元の行は累積
        assert_eq!(lines[1][0].generated_column, 0);
        assert_eq!(lines[1][0].original_line, 1);
        assert_eq!(lines[1][0].original_column, 4);
        assert_eq!(lines[1][0].source, Some(0));
    }

    #[test]
    fn test_decode_mappings_empty_lines() {
        let lines = decode_mappings(";;AAGA").unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_empty());
        assert_eq!(lines[2][0].original_line, 3);
    }
}
