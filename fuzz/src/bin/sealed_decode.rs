#[macro_use]
extern crate afl;
use chat_digest::SealedFile;

fn main() {
    fuzz!(|data: &[u8]| {
        let _ = SealedFile::from_bytes(data);
    });
}
