//! 6-bit 自定义字母表编解码
//!
//! 设备使用一套类 base64 的字母表（**不是**标准 base64）：
//!
//! ```text
//! 索引:  0..=25  26..=51  52..=61  62  63
//! 字符:  A-Z     a-z      0-9      -   _
//! ```
//!
//! 多字符编码时低 6 位在前：第 `i` 个字符编码 `(v >> (6 * i)) & 0x3F`。
//! 移位是算术移位，负数保持补码语义（轮子/关节增量可以为负）。

/// 设备字母表（顺序固定）
pub const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// 单个字符承载的位数
pub const BITS_PER_CHAR: u32 = 6;

const MASK: i64 = 0x3F;

/// 将整数的低 6 位映射为字母表中的字符
///
/// 任意输入都成功，`v` 与 `v + 64` 编码结果相同。
///
/// # 示例
///
/// ```rust
/// use mebo_protocol::alphabet::encode_char;
///
/// assert_eq!(encode_char(0), 'A');
/// assert_eq!(encode_char(63), '_');
/// assert_eq!(encode_char(64), 'A');
/// assert_eq!(encode_char(-1), '_');
/// ```
#[inline]
pub fn encode_char(v: i64) -> char {
    ALPHABET[(v & MASK) as usize] as char
}

/// 将整数编码为 `width` 个字符（低位在前）
///
/// 超过 63 位的移位按 63 处理，与无限精度整数的算术移位结果一致：
/// 正数高位全为 `A`，负数高位全为 `_`。
///
/// # 示例
///
/// ```rust
/// use mebo_protocol::alphabet::encode_value;
///
/// assert_eq!(encode_value(20, 2), "UA");
/// assert_eq!(encode_value(-20, 2), "s_");
/// assert_eq!(encode_value(0, 2), "AA");
/// ```
pub fn encode_value(v: i64, width: usize) -> String {
    (0..width)
        .map(|i| {
            let shift = (i as u32 * BITS_PER_CHAR).min(63);
            encode_char(v >> shift)
        })
        .collect()
}

/// 字符反查索引
pub fn decode_char(c: char) -> Option<u8> {
    match c {
        'A'..='Z' => Some(c as u8 - b'A'),
        'a'..='z' => Some(c as u8 - b'a' + 26),
        '0'..='9' => Some(c as u8 - b'0' + 52),
        '-' => Some(62),
        '_' => Some(63),
        _ => None,
    }
}

/// 反向解码 `encode_value` 的输出
///
/// 返回无符号的位域值（`width * 6` 位）。字符串为空、过长（> 5 个字符）
/// 或包含字母表以外的字符时返回 `None`。
pub fn decode_value(s: &str) -> Option<u32> {
    if s.is_empty() || s.chars().count() > 5 {
        return None;
    }

    s.chars().enumerate().try_fold(0u32, |acc, (i, c)| {
        decode_char(c).map(|bits| acc | (u32::from(bits) << (i as u32 * BITS_PER_CHAR)))
    })
}

/// 将 `bits` 位宽的位域按补码还原为有符号数
///
/// 两字符编码是 12 位，`sign_extend(0xFEC, 12) == -20`。
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    debug_assert!(bits > 0 && bits <= 32);
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}
