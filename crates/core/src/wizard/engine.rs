//! Pure reducer for the quote wizard. Applying an event yields a new
//! state or a typed rejection; nothing here touches a store — the first
//! collaborator call happens when the produced payload is submitted.

use thiserror::Error;

use crate::domain::catalog::{OptionId, ServiceOffer};
use crate::domain::quote::Selection;
use crate::validate::{
    contact_errors, description_errors, FieldError, QuotePayload, SelectionPayload,
};
use crate::wizard::states::{WizardEvent, WizardState, WizardStep};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("step {step:?} is incomplete: {} field error(s)", errors.len())]
    StepIncomplete { step: WizardStep, errors: Vec<FieldError> },
    #[error("option {0:?} is bundled with the selected offer and cannot be removed")]
    OptionLocked(OptionId),
    #[error("quantity must be between 1 and 999, got {0}")]
    QuantityOutOfRange(u32),
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
}

/// Field errors blocking the given step, using the same partial rules the
/// submission validator applies. Empty means the "next" action is enabled.
pub fn step_errors(step: WizardStep, state: &WizardState) -> Vec<FieldError> {
    let form = &state.form;
    match step {
        WizardStep::Contact => contact_errors(
            &form.first_name,
            &form.last_name,
            &form.email,
            &form.phone,
            state.require_full_identity,
        ),
        // The base offer is optional: options can be quoted stand-alone.
        WizardStep::Offer => Vec::new(),
        WizardStep::Options => description_errors(&form.project_description),
        WizardStep::Review => {
            let mut errors = step_errors(WizardStep::Contact, state);
            errors.extend(step_errors(WizardStep::Options, state));
            errors
        }
    }
}

pub fn can_advance(step: WizardStep, state: &WizardState) -> bool {
    step_errors(step, state).is_empty()
}

/// Apply one event. The input state is left untouched so a caller can
/// keep history or retry freely.
pub fn apply(state: &WizardState, event: WizardEvent) -> Result<WizardState, WizardError> {
    let mut next = state.clone();

    match event {
        WizardEvent::SetContact { first_name, last_name, email, phone } => {
            next.form.first_name = first_name;
            next.form.last_name = last_name;
            next.form.email = email;
            next.form.phone = phone;
        }
        WizardEvent::ChooseOffer { offer } => {
            reconcile_offer(&mut next, offer);
        }
        WizardEvent::ToggleOption { option_id } => {
            if is_locked(&next, &option_id) {
                return Err(WizardError::OptionLocked(option_id));
            }
            let selections = &mut next.form.selections;
            match selections.iter().position(|selection| selection.option_id == option_id) {
                Some(index) => {
                    selections.remove(index);
                }
                None => selections.push(Selection { option_id, quantity: 1 }),
            }
        }
        WizardEvent::SetQuantity { option_id, quantity } => {
            if !(1..=999).contains(&quantity) {
                return Err(WizardError::QuantityOutOfRange(quantity));
            }
            if let Some(selection) = next
                .form
                .selections
                .iter_mut()
                .find(|selection| selection.option_id == option_id)
            {
                selection.quantity = quantity;
            }
        }
        WizardEvent::SetDescription { text } => {
            next.form.project_description = Some(text);
        }
        WizardEvent::SetDeliveryDate { date } => {
            next.form.desired_delivery_date = date;
        }
        WizardEvent::Next => {
            let errors = step_errors(next.step, &next);
            if !errors.is_empty() {
                return Err(WizardError::StepIncomplete { step: next.step, errors });
            }
            next.step = next.step.next().ok_or(WizardError::AtLastStep)?;
        }
        WizardEvent::Back => {
            next.step = next.step.previous().ok_or(WizardError::AtFirstStep)?;
        }
        WizardEvent::Restart => {
            next = WizardState::new(state.require_full_identity);
        }
    }

    Ok(next)
}

/// Build the submission payload from a completed wizard. Bundled options
/// are re-unioned here, so they reach the submission even if the form
/// state was tampered with.
pub fn submission(state: &WizardState) -> Result<QuotePayload, WizardError> {
    let errors = step_errors(WizardStep::Review, state);
    if !errors.is_empty() {
        return Err(WizardError::StepIncomplete { step: WizardStep::Review, errors });
    }

    let form = &state.form;
    let mut selections = form.selections.clone();
    if let Some(offer) = &form.offer {
        for option_id in &offer.included_option_ids {
            if !selections.iter().any(|selection| &selection.option_id == option_id) {
                selections.push(Selection { option_id: option_id.clone(), quantity: 1 });
            }
        }
    }

    Ok(QuotePayload {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        project_description: form.project_description.clone(),
        desired_delivery_date: form.desired_delivery_date.clone(),
        offer_id: form.offer.as_ref().map(|offer| offer.id.0.clone()),
        options: selections
            .into_iter()
            .map(|selection| SelectionPayload {
                option_id: Some(selection.option_id.0),
                quantity: Some(i64::from(selection.quantity)),
            })
            .collect(),
        appointment: None,
    })
}

fn is_locked(state: &WizardState, option_id: &OptionId) -> bool {
    state.form.offer.as_ref().map_or(false, |offer| offer.includes(option_id))
}

/// Swap the selected offer: bundled options of the old offer leave the
/// selection, bundled options of the new one enter it pre-checked.
fn reconcile_offer(state: &mut WizardState, offer: Option<ServiceOffer>) {
    if let Some(previous) = &state.form.offer {
        let previous_included = previous.included_option_ids.clone();
        state
            .form
            .selections
            .retain(|selection| !previous_included.contains(&selection.option_id));
    }

    if let Some(new_offer) = &offer {
        for option_id in &new_offer.included_option_ids {
            if !state
                .form
                .selections
                .iter()
                .any(|selection| &selection.option_id == option_id)
            {
                state
                    .form
                    .selections
                    .push(Selection { option_id: option_id.clone(), quantity: 1 });
            }
        }
    }

    state.form.offer = offer;
}
