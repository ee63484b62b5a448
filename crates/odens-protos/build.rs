extern crate glob;
extern crate protobuf_codegen;

use protobuf_codegen::Codegen;

fn main() {
    // Every schema under src/protos is compiled into one generated module each
    let proto_files = glob::glob("src/protos/*.proto")
        .expect("Failed to read glob pattern")
        .map(|entry| entry.expect("Failed to read proto path"))
        .collect::<Vec<_>>();

    println!("cargo:rerun-if-changed=src/protos");

    Codegen::new()
        .pure()
        .cargo_out_dir("protos")
        .inputs(&proto_files)
        .include("src/protos")
        .run_from_script();
}
