fn main() {
    // Tell Cargo that if the given file changes, to rerun this build script.
    println!("cargo:rerun-if-changed=src/compensate.c");
    // The datasheet formula relies on two's complement wrap-around, which C
    // only guarantees with -fwrapv.
    cc::Build::new()
        .file("src/compensate.c")
        .flag_if_supported("-fwrapv")
        .compile("bmp180_reference");
}
