//! Shared handle to a flow controller for single-threaded front ends

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{FlowController, FlowState};
use crate::error::{FlowError, Result};
use crate::step::{Step, StepEvent, StepId};

/// Cloneable handle to one flow.
///
/// Every call borrows the controller for its whole duration. A call made
/// while another is still running (a presenter reacting to `render` by
/// advancing, say) fails with [`FlowError::Reentrancy`] instead of mutating
/// history halfway through a transition.
#[derive(Clone)]
pub struct FlowHandle {
    inner: Rc<RefCell<FlowController>>,
}

/// Non-owning form of [`FlowHandle`], for collaborators owned by the flow
#[derive(Clone, Default)]
pub struct WeakFlowHandle {
    inner: Weak<RefCell<FlowController>>,
}

impl WeakFlowHandle {
    pub fn upgrade(&self) -> Option<FlowHandle> {
        self.inner.upgrade().map(|inner| FlowHandle { inner })
    }
}

impl FlowHandle {
    pub fn new(controller: FlowController) -> Self {
        Self {
            inner: Rc::new(RefCell::new(controller)),
        }
    }

    /// Build a controller whose collaborators need a handle back to it
    pub fn new_cyclic(build: impl FnOnce(WeakFlowHandle) -> FlowController) -> Self {
        let inner = Rc::new_cyclic(|weak| {
            RefCell::new(build(WeakFlowHandle {
                inner: weak.clone(),
            }))
        });
        Self { inner }
    }

    pub fn downgrade(&self) -> WeakFlowHandle {
        WeakFlowHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut FlowController) -> Result<R>) -> Result<R> {
        let mut flow = self.inner.try_borrow_mut().map_err(|_| {
            tracing::error!("flow called while it is already handling an operation");
            FlowError::Reentrancy
        })?;
        f(&mut *flow)
    }

    /// Read-only access to the controller
    pub fn inspect<R>(&self, f: impl FnOnce(&FlowController) -> R) -> Result<R> {
        let flow = self
            .inner
            .try_borrow()
            .map_err(|_| FlowError::Reentrancy)?;
        Ok(f(&*flow))
    }

    pub fn start(&self, initial: Step) -> Result<()> {
        self.with(|flow| flow.start(initial))
    }

    pub fn advance(&self) -> Result<()> {
        self.with(FlowController::advance)
    }

    pub fn back(&self) -> Result<()> {
        self.with(FlowController::back)
    }

    pub fn dismiss(&self) -> Result<()> {
        self.with(FlowController::dismiss)
    }

    pub fn dispatch(&self, event: StepEvent) -> Result<()> {
        self.with(|flow| flow.dispatch(event))
    }

    pub fn pump(&self) -> Result<usize> {
        self.with(FlowController::pump)
    }

    pub fn display_activity_indicator(&self) -> Result<()> {
        self.with(|flow| {
            flow.display_activity_indicator();
            Ok(())
        })
    }

    pub fn hide_activity_indicator(&self) -> Result<()> {
        self.with(|flow| {
            flow.hide_activity_indicator();
            Ok(())
        })
    }

    pub fn state(&self) -> Result<FlowState> {
        self.inspect(FlowController::state)
    }

    pub fn depth(&self) -> Result<usize> {
        self.inspect(FlowController::depth)
    }

    pub fn current_id(&self) -> Result<Option<StepId>> {
        self.inspect(|flow| flow.current().map(Step::id))
    }
}
