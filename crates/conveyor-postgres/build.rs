/// Tells Cargo to rerun the build when migrations change, because
/// `embed_migrations!()` cannot track the directory on its own.
///
/// See <https://docs.rs/diesel_migrations/latest/diesel_migrations/macro.embed_migrations.html>
fn main() {
    println!("cargo:rerun-if-changed=./migrations");
}
