//! The WordCount worker binary: registers the WordCount job under the
//! `"wordcount"` class name and delegates straight to `mrlite-worker`'s
//! shared run routine.

fn main() {
    let mut registries = mrlite_worker::Registries::new();
    wordcount::register(&mut registries);
    std::process::exit(mrlite_worker::run(&registries));
}
