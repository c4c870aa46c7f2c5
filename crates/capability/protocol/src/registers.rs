//! 寄存器数值编解码
//!
//! Modbus 读回的寄存器字序列按大端字序拼接为字节缓冲，再按参数
//! 声明的编码在偏移 0 处读取单个数值。解析失败不重试。

use crate::error::ProtocolError;
use domain::RegisterEncoding;

/// 将寄存器字序列打包为大端字节缓冲。
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(words.len() * 2);
    for word in words {
        buf.extend_from_slice(&word.to_be_bytes());
    }
    buf
}

/// 按编码解析字节缓冲为 f64。
pub fn parse_value(buf: &[u8], encoding: RegisterEncoding) -> Result<f64, ProtocolError> {
    let value = match encoding {
        RegisterEncoding::Float32Be => f32::from_be_bytes(take::<4>(buf)?) as f64,
        RegisterEncoding::Float32Le => f32::from_le_bytes(take::<4>(buf)?) as f64,
        RegisterEncoding::Int16Be => i16::from_be_bytes(take::<2>(buf)?) as f64,
        RegisterEncoding::Int16Le => i16::from_le_bytes(take::<2>(buf)?) as f64,
        RegisterEncoding::Uint16Be => u16::from_be_bytes(take::<2>(buf)?) as f64,
        RegisterEncoding::Uint16Le => u16::from_le_bytes(take::<2>(buf)?) as f64,
        RegisterEncoding::Int32Be => i32::from_be_bytes(take::<4>(buf)?) as f64,
        RegisterEncoding::Int32Le => i32::from_le_bytes(take::<4>(buf)?) as f64,
        RegisterEncoding::Uint32Be => u32::from_be_bytes(take::<4>(buf)?) as f64,
        RegisterEncoding::Uint32Le => u32::from_le_bytes(take::<4>(buf)?) as f64,
    };
    Ok(value)
}

/// 按编码将数值写回字节缓冲（解析的逆操作，回归校验用）。
pub fn encode_value(value: f64, encoding: RegisterEncoding) -> Vec<u8> {
    match encoding {
        RegisterEncoding::Float32Be => (value as f32).to_be_bytes().to_vec(),
        RegisterEncoding::Float32Le => (value as f32).to_le_bytes().to_vec(),
        RegisterEncoding::Int16Be => (value as i16).to_be_bytes().to_vec(),
        RegisterEncoding::Int16Le => (value as i16).to_le_bytes().to_vec(),
        RegisterEncoding::Uint16Be => (value as u16).to_be_bytes().to_vec(),
        RegisterEncoding::Uint16Le => (value as u16).to_le_bytes().to_vec(),
        RegisterEncoding::Int32Be => (value as i32).to_be_bytes().to_vec(),
        RegisterEncoding::Int32Le => (value as i32).to_le_bytes().to_vec(),
        RegisterEncoding::Uint32Be => (value as u32).to_be_bytes().to_vec(),
        RegisterEncoding::Uint32Le => (value as u32).to_le_bytes().to_vec(),
    }
}

fn take<const N: usize>(buf: &[u8]) -> Result<[u8; N], ProtocolError> {
    buf.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| ProtocolError::DataParse(format!("need {} bytes, got {}", N, buf.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float32_be_parses_ieee754() {
        // 1.0f32 = 0x3F800000
        let buf = [0x3F, 0x80, 0x00, 0x00];
        let value = parse_value(&buf, RegisterEncoding::Float32Be).unwrap();
        assert_eq!(value, 1.0);
    }

    #[test]
    fn int16_be_parses_twos_complement() {
        let buf = (-123i16).to_be_bytes();
        let value = parse_value(&buf, RegisterEncoding::Int16Be).unwrap();
        assert_eq!(value, -123.0);
    }

    #[test]
    fn uint32_le_parses_at_offset_zero() {
        // 缓冲长于编码宽度时，只读偏移 0 处
        let mut buf = 305419896u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xFF, 0xFF]);
        let value = parse_value(&buf, RegisterEncoding::Uint32Le).unwrap();
        assert_eq!(value, 305419896.0);
    }

    #[test]
    fn short_buffer_is_a_parse_error() {
        let result = parse_value(&[0x3F], RegisterEncoding::Float32Be);
        assert!(matches!(result, Err(ProtocolError::DataParse(_))));
    }

    #[test]
    fn words_pack_big_endian() {
        assert_eq!(words_to_bytes(&[0x3F80, 0x0000]), vec![0x3F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn encode_parse_round_trips_every_encoding() {
        let cases = [
            (1.0, RegisterEncoding::Float32Be),
            (-2.5, RegisterEncoding::Float32Le),
            (-123.0, RegisterEncoding::Int16Be),
            (-123.0, RegisterEncoding::Int16Le),
            (456.0, RegisterEncoding::Uint16Be),
            (456.0, RegisterEncoding::Uint16Le),
            (-70000.0, RegisterEncoding::Int32Be),
            (-70000.0, RegisterEncoding::Int32Le),
            (3000000.0, RegisterEncoding::Uint32Be),
            (3000000.0, RegisterEncoding::Uint32Le),
        ];
        for (value, encoding) in cases {
            let buf = encode_value(value, encoding);
            let parsed = parse_value(&buf, encoding).unwrap();
            assert_eq!(parsed, value, "encoding {:?}", encoding);
            // 字节级回环
            assert_eq!(encode_value(parsed, encoding), buf);
        }
    }
}
