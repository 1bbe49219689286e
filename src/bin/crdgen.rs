//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from the Rust
//! type definitions of every resource the operator reads or writes.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/codebase-operator.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use codebase_operator::crd::{
    CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream, GitServer, JenkinsFolder,
};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [
        Codebase::crd(),
        CodebaseBranch::crd(),
        CodebaseImageStream::crd(),
        CDStageDeploy::crd(),
        GitServer::crd(),
        JenkinsFolder::crd(),
    ];

    let mut documents = Vec::with_capacity(crds.len());
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => documents.push(yaml),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
    print!("{}", documents.join("---\n"));
}
