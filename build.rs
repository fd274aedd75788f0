fn main() {
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if arch == "riscv64" && os == "none" {
        println!("cargo:rustc-link-arg-bins=-Tsrc/linker.ld");
    }
    println!("cargo:rerun-if-changed=src/linker.ld");
    println!("cargo:rerun-if-env-changed=NT_TRAPOS_BOOTARGS");
}
