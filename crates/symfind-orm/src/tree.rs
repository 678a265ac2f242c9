//! Expression tree builder
//!
//! Reduces the ordered criteria of one condition class into a single boolean
//! expression using an explicit stack of open groups. Groups still open after
//! the last criterion are closed implicitly.

use symfind_core::{Condition, CriteriaError};

use crate::criterion::{Combinator, Criterion, Junctor};

struct Frame {
	combinator: Combinator,
	negated: bool,
	components: Vec<Condition>,
}

impl Frame {
	fn new(combinator: Combinator, negated: bool) -> Self {
		Self {
			combinator,
			negated,
			components: Vec::new(),
		}
	}

	fn into_condition(self) -> Condition {
		let condition = match self.combinator {
			Combinator::And => Condition::and(self.components),
			Combinator::Or => Condition::or(self.components),
		};
		if self.negated { condition.negate() } else { condition }
	}
}

/// Build the condition for `criteria`, compiling leaves with `leaf`
///
/// Returns `None` when there are no criteria. A single top-level component is
/// returned as is rather than wrapped in a one-element conjunction.
pub fn build_condition<F>(criteria: &mut [Criterion], mut leaf: F) -> Result<Option<Condition>, CriteriaError>
where
	F: FnMut(&mut Criterion) -> Condition,
{
	if criteria.is_empty() {
		return Ok(None);
	}

	let mut stack = vec![Frame::new(Combinator::And, false)];
	for criterion in criteria.iter_mut() {
		for junctor in &criterion.junctors {
			match *junctor {
				Junctor::Open { combinator, negated } => stack.push(Frame::new(combinator, negated)),
				Junctor::Close => {
					if stack.len() < 2 {
						return Err(CriteriaError::UnbalancedGroup {
							key: criterion.field.clone(),
						});
					}
					close_group(&mut stack);
				}
			}
		}
		if criterion.field.is_empty() {
			continue;
		}
		let condition = leaf(criterion);
		if let Some(top) = stack.last_mut() {
			top.components.push(condition);
		}
	}

	while stack.len() > 1 {
		close_group(&mut stack);
	}
	let root = match stack.pop() {
		Some(frame) => frame,
		None => return Ok(None),
	};
	if root.components.len() == 1 {
		return Ok(root.components.into_iter().next());
	}
	Ok(Some(root.into_condition()))
}

fn close_group(stack: &mut Vec<Frame>) {
	if let Some(frame) = stack.pop() {
		let composite = frame.into_condition();
		if let Some(parent) = stack.last_mut() {
			parent.components.push(composite);
		}
	}
}
