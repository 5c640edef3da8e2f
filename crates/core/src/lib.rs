pub mod approvals;
pub mod audit;
pub mod calculator;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod store;

pub use approvals::{ApproverSelector, SelectionError};
pub use calculator::{calculate_charges, calculate_emi, CalculationError, EmiInput, EmiResult};
pub use domain::application::{LoanApplication, LoanApplicationId, ProductId};
pub use domain::approver::{Approver, ApproverId, Role};
pub use errors::{InterfaceError, WorkflowError};
pub use flows::{Actor, LoanWorkflow, TargetStage, TransitionRequest, WorkflowPolicy};
pub use store::{StoreError, WorkflowStore, WorkflowTx};
