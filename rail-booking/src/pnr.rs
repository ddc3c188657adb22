use rand::Rng;

pub const PNR_LENGTH: usize = 10;

/// Random 10-digit PNR. The first digit is never zero.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let mut pnr = String::with_capacity(PNR_LENGTH);
    pnr.push(char::from(b'0' + rng.gen_range(1..=9u8)));
    for _ in 1..PNR_LENGTH {
        pnr.push(char::from(b'0' + rng.gen_range(0..=9u8)));
    }
    pnr
}

pub fn is_well_formed(pnr: &str) -> bool {
    pnr.len() == PNR_LENGTH && pnr.bytes().all(|b| b.is_ascii_digit())
}
