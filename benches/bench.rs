use criterion::{criterion_group, criterion_main, Criterion};
use yamltree::{
    ComposeOptions, Composer, Desolver, Emitter, Resolver, SerializeOptions, Serializer,
};

fn large_document() -> Vec<u8> {
    let mut text = String::with_capacity(1 << 20);
    for section in 0..200 {
        text.push_str(&format!("section{section}:\n"));
        for entry in 0..20 {
            text.push_str(&format!("  key{entry}: value with some text {entry}\n"));
            text.push_str(&format!("  list{entry}:\n"));
            for item in 0..5 {
                text.push_str(&format!("  - item {item}\n"));
            }
        }
    }
    text.into_bytes()
}

pub fn load(c: &mut Criterion) {
    let input = large_document();
    c.bench_function("load large", |b| {
        b.iter(|| {
            let mut bytes = input.as_slice();
            let mut composer = Composer::new(ComposeOptions::default());
            composer.set_input(&mut bytes);
            let mut tree = composer.compose().unwrap().unwrap();
            Resolver::new().resolve(&mut tree).unwrap();
            tree
        })
    });
}

pub fn dump(c: &mut Criterion) {
    let input = large_document();
    let mut bytes = input.as_slice();
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut bytes);
    let mut tree = composer.compose().unwrap().unwrap();
    Resolver::new().resolve(&mut tree).unwrap();
    Desolver::default().desolve(&mut tree);
    c.bench_function("dump large", |b| {
        b.iter(|| {
            let mut output = Vec::with_capacity(1 << 20);
            let mut emitter = Emitter::new();
            emitter.set_output_string(&mut output);
            let mut serializer = Serializer::new(emitter, SerializeOptions::default());
            serializer.serialize(&tree).unwrap();
            serializer.finish().unwrap();
            output
        })
    });
}

criterion_group!(benches, load, dump);
criterion_main!(benches);
