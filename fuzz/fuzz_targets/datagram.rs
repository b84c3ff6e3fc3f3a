#![no_main]

use libfuzzer_sys::fuzz_target;
use netchan::{channel::Netchan, msg::Msg};

// Any sequence of byte streams fed to a channel is delivered, discarded,
// or a typed error; never a panic.
fuzz_target!(|datagrams: Vec<Vec<u8>>| {
    let mut chan = Netchan::setup("127.0.0.1:27910".parse().unwrap(), 0);
    for datagram in &datagrams {
        let mut msg = Msg::from_slice(datagram);
        let _ = chan.process(&mut msg);
    }
});
