//! The generic worker binary (spec.md §1's "worker processes"). Run
//! standalone, it has no classes registered and will fail any
//! `mapper_class`/`reducer_class` lookup — a real job links
//! `mrlite-worker` as a library and registers its own `Mapper`/
//! `IncrementalReducer`/`BatchReducer` implementations first (see
//! `demos/wordcount`).

fn main() {
    let registries = mrlite_worker::Registries::new();
    std::process::exit(mrlite_worker::run(&registries));
}
