use rand::Rng;

/// Random lowercase hex string of `len` characters (phone code hashes, mock session ids).
pub fn generate_hex_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}
