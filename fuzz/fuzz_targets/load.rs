#![no_main]

use libfuzzer_sys::fuzz_target;
use yamltree::{ComposeOptions, Composer, Desolver, Resolver};

fuzz_target!(|data: &[u8]| fuzz_target(data));

fn fuzz_target(mut data: &[u8]) {
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut data);
    let resolver = Resolver::new();
    let desolver = Desolver::default();

    while let Ok(Some(mut tree)) = composer.compose() {
        if resolver.resolve(&mut tree).is_err() {
            break;
        }
        desolver.desolve(&mut tree);
    }
}
