use aes256_filter::{Action, CipherEngine};

/// Push all of `input` through `engine` in one logical pass: offer the whole
/// slice with `DataEnd` set immediately, then keep re-offering the same
/// slice on `Repeat` until the engine reports `DataEnd`.
pub fn drive(engine: &mut CipherEngine, input: &[u8], out_cap: usize) -> Vec<u8> {
    let mut output = Vec::new();
    let mut action = Action::DataEnd;
    loop {
        let mut buf = vec![0u8; out_cap];
        let (n, next) = engine.process(input, &mut buf, action).expect("process failed");
        output.extend_from_slice(&buf[..n]);
        if next == Action::DataEnd {
            break;
        }
        action = Action::Repeat;
    }
    output
}
