//! Common test helpers and utilities.

#![allow(dead_code)]

pub mod fake_server;
pub mod pipe;
pub mod temp_workspace;

// Re-export for convenience; each test binary uses a different subset.
#[allow(unused_imports)]
pub use fake_server::FakeServer;
#[allow(unused_imports)]
pub use temp_workspace::{TestWorkspace, connect};

/// A small Go module with the cursor on a call to `Add`.
pub const GO_MODULE: &str = r#"
//- go.mod
module example.com/calc

go 1.22
//- calc/add.go
package calc

// Add returns the sum of a and b.
func Add(a, b int) int {
	return a + b
}
//- main.go
package main

import "example.com/calc"

func main() {
	println(calc.$0Add(1, 2))
}
"#;
