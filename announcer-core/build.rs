fn main() {
    // The generated sources are checked in under src/proto. Enable
    // `proto-gen` to rebuild them after editing the .proto files.
    #[cfg(feature = "proto-gen")]
    {
        let proto_files = ["../proto/manager.proto", "../proto/trainer.proto"];
        let proto_dir = "../proto";

        // Rerun if proto files change
        for proto_file in proto_files {
            println!("cargo:rerun-if-changed={}", proto_file);
        }

        tonic_build::configure()
            .build_server(true)
            .build_client(true)
            .out_dir("src/proto")
            .compile_protos(&proto_files, &[proto_dir])
            .expect("Failed to compile manager and trainer protos");
    }
}
