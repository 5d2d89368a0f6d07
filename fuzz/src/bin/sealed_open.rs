#[macro_use]
extern crate afl;
use chat_digest::Identity;

fn main() {
    // The holder of the archive
    let identity = Identity::generate().expect("Setup failed");

    fuzz!(|data: &[u8]| {
        let _ = identity.open(data);
    });
}
