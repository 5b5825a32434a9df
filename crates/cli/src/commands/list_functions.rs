use clap::Parser;
use console::style;
use ethers::abi::{Abi, Function, Param, StateMutability};
use token_deployer::{
    artifacts::ArtifactRepository, proxy::TRANSPARENT_PROXY_CONTRACT, TOKEN_CONTRACT_NAME,
};

use crate::messages::MSG_FUNCTIONS_OF;

#[derive(Debug, Parser)]
pub struct ListFunctionsArgs {
    /// Contract names. Defaults to the proxy and the token
    pub contracts: Vec<String>,
}

fn mutability(function: &Function) -> &'static str {
    match function.state_mutability {
        StateMutability::Pure => "pure",
        StateMutability::View => "view",
        StateMutability::NonPayable => "nonpayable",
        StateMutability::Payable => "payable",
    }
}

fn param_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| match param.name.as_str() {
            "" => param.kind.to_string(),
            name => format!("{} {name}", param.kind),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per ABI function: signature, state mutability and outputs.
pub fn describe_functions(abi: &Abi) -> Vec<String> {
    abi.functions()
        .map(|function| {
            let inputs = function
                .inputs
                .iter()
                .map(|param| param.kind.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let mut line = format!("{}({inputs}) {}", function.name, mutability(function));
            if !function.outputs.is_empty() {
                line += &format!(" returns ({})", param_list(&function.outputs));
            }
            line
        })
        .collect()
}

pub(crate) fn run(
    args: ListFunctionsArgs,
    artifacts: &dyn ArtifactRepository,
) -> anyhow::Result<()> {
    let contracts = if args.contracts.is_empty() {
        vec![TRANSPARENT_PROXY_CONTRACT.to_owned(), TOKEN_CONTRACT_NAME.to_owned()]
    } else {
        args.contracts
    };

    for name in contracts {
        let artifact = artifacts.read_artifact(&name)?;
        println!(
            "{MSG_FUNCTIONS_OF} {}",
            style(artifact.fully_qualified_name()).bold()
        );
        for line in describe_functions(&artifact.abi) {
            println!("  {line}");
        }
    }
    Ok(())
}
