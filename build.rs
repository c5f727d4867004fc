fn main() -> Result<(), std::io::Error> {
    prost_build::compile_protos(&["src/protos/paxos/v1/paxos.proto"], &["src/protos/"])?;
    Ok(())
}
