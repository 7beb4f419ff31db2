/*!
A generic fixed-point solver for monotone dataflow analyses on directed graphs.

# What the solver does

A dataflow analysis computes for every node of a flow graph,
e.g. the control flow graph of a function,
a value describing some property of the program at that node,
like the set of variable definitions reaching it.
The solver takes the flow graph and the transfer functions of such an analysis,
translates them into an equation system over lattice variables
and computes a fixed point of that system with a worklist algorithm.

The values must form a partially ordered set in which every ascending chain is finite
and the transfer functions must be monotone,
otherwise the iteration is not guaranteed to terminate.
Where the structure of the equations allows it,
the solver aliases variables connected by identity transfer functions
or by meets over a single predecessor,
so that fewer variables and statements take part in the iteration.

# Usage

To solve a dataflow problem, implement
[`TransferFunctionProvider`](dataflow::TransferFunctionProvider) and
[`DataflowProblem`](dataflow::DataflowProblem) for the analysis
and hand the problem to a [`DataflowSolver`](dataflow::DataflowSolver):
```ignore
let mut solver = DataflowSolver::new(problem, &factory, SolverConfig::default())?;
solver.solve();
let value = solver.get_in(node);
```
For analyses over sets of facts, like reaching definitions or live variables,
the [`bitvector`] module provides ready-made transfer functions and meet operators
over bitvector lattices together with the mapping between facts and bit positions.

Equation systems that do not stem from a flow graph can be built and solved
directly through the [`fixpoint`] module.
*/

pub mod bitvector;
pub mod dataflow;
pub mod fixpoint;
pub mod utils;

mod prelude {
    pub use serde::{Deserialize, Serialize};

    pub use anyhow::{anyhow, Error};
}
