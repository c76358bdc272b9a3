pub trait ParseFromEnv: Sized {
    /// Parse a raw environment value, `None` when empty or malformed
    fn parse_value(raw: &str) -> Option<Self>;

    #[inline]
    fn parse_from_env(key: &str) -> Option<Self> {
        ::std::env::var(key).ok().and_then(|v| Self::parse_value(&v))
    }
}

impl ParseFromEnv for bool {
    #[inline]
    fn parse_value(raw: &str) -> Option<bool> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
            Some(true)
        } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
            Some(false)
        } else {
            None
        }
    }
}

impl ParseFromEnv for String {
    #[inline]
    fn parse_value(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        // If after trimming is empty, use default value
        if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
    }
}

macro_rules! impl_parse_num_from_env {
    ($($ty:ty)*) => {
        $(
            impl ParseFromEnv for $ty {
                #[inline]
                fn parse_value(raw: &str) -> Option<$ty> { raw.trim().parse().ok() }
            }
        )*
    };
}

impl_parse_num_from_env!(i8 u8 i16 u16 i32 u32 i64 u64 i128 u128 isize usize);

#[inline]
pub fn parse_from_env<T: ParseFromEnv>(key: &str, default: T) -> T {
    T::parse_from_env(key).unwrap_or(default)
}
