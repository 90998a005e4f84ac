fn main() {
    // ESP-IDF link arguments are only needed for the firmware image;
    // host-side test builds run with `--no-default-features`.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
