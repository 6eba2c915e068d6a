//! PAM credential verifier.
//!
//! [`PamService`] starts a PAM transaction for the user being locked out;
//! the resulting [`PamVerifier`] runs `pam_authenticate` once per submitted
//! password. The conversation function answers PAM's text prompts from the
//! session's [`SecretProvider`] and ignores info and error messages.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;

use secrecy::ExposeSecret;
use shroud_core::verifier::{Prompt, PromptStyle, SecretProvider};
use shroud_core::{AuthResult, CredentialVerifier, VerifierError, VerifierService};
use tracing::{debug, trace};
use zeroize::Zeroize;

const PAM_SUCCESS: c_int = 0;
const PAM_BUF_ERR: c_int = 5;
const PAM_AUTH_ERR: c_int = 7;
const PAM_CRED_INSUFFICIENT: c_int = 8;
const PAM_USER_UNKNOWN: c_int = 10;
const PAM_MAXTRIES: c_int = 11;
const PAM_CONV_ERR: c_int = 19;

const PAM_PROMPT_ECHO_OFF: c_int = 1;
const PAM_PROMPT_ECHO_ON: c_int = 2;
const PAM_ERROR_MSG: c_int = 3;
const PAM_TEXT_INFO: c_int = 4;

const PAM_MAX_NUM_MSG: c_int = 32;

#[repr(C)]
struct PamHandle {
    _private: [u8; 0],
}

#[repr(C)]
struct PamMessage {
    msg_style: c_int,
    msg: *const c_char,
}

#[repr(C)]
#[allow(dead_code)]
struct PamResponse {
    resp: *mut c_char,
    resp_retcode: c_int,
}

type ConvFn = unsafe extern "C" fn(
    num_msg: c_int,
    msg: *mut *const PamMessage,
    resp: *mut *mut PamResponse,
    appdata_ptr: *mut c_void,
) -> c_int;

#[repr(C)]
#[allow(dead_code)]
struct PamConv {
    conv: Option<ConvFn>,
    appdata_ptr: *mut c_void,
}

#[link(name = "pam")]
extern "C" {
    fn pam_start(
        service_name: *const c_char,
        user: *const c_char,
        pam_conversation: *const PamConv,
        pamh: *mut *mut PamHandle,
    ) -> c_int;
    fn pam_authenticate(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_end(pamh: *mut PamHandle, pam_status: c_int) -> c_int;
    fn pam_strerror(pamh: *mut PamHandle, errnum: c_int) -> *const c_char;
}

/// Map a `pam_authenticate` return code to an authentication outcome.
pub fn auth_result(status: c_int, message: String) -> AuthResult {
    match status {
        PAM_SUCCESS => AuthResult::Accepted,
        PAM_AUTH_ERR | PAM_CRED_INSUFFICIENT | PAM_USER_UNKNOWN | PAM_MAXTRIES => {
            AuthResult::Rejected(message)
        }
        _ => AuthResult::Error(message),
    }
}

fn prompt_style(msg_style: c_int) -> Option<PromptStyle> {
    match msg_style {
        PAM_PROMPT_ECHO_OFF => Some(PromptStyle::HiddenText),
        PAM_PROMPT_ECHO_ON => Some(PromptStyle::VisibleText),
        PAM_ERROR_MSG => Some(PromptStyle::ErrorMessage),
        PAM_TEXT_INFO => Some(PromptStyle::Info),
        _ => None,
    }
}

fn strerror(handle: *mut PamHandle, status: c_int) -> String {
    // SAFETY: pam_strerror returns a static string or NULL.
    let message = unsafe { pam_strerror(handle, status) };
    if message.is_null() {
        return format!("PAM error {}", status);
    }
    // SAFETY: non-null results are NUL-terminated.
    unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned()
}

/// Where the conversation function finds the provider of the running round.
///
/// Holds a pointer to a `&dyn SecretProvider` that lives on the stack of
/// [`PamVerifier::authenticate`]; null outside of a round.
struct ConvSlot {
    provider: std::cell::Cell<*const c_void>,
}

/// Zero and free the first `count` responses, then the array.
unsafe fn free_responses(responses: *mut PamResponse, count: usize) {
    for i in 0..count {
        let response = &mut *responses.add(i);
        if !response.resp.is_null() {
            let len = libc::strlen(response.resp);
            std::slice::from_raw_parts_mut(response.resp.cast::<u8>(), len).zeroize();
            libc::free(response.resp.cast());
        }
    }
    libc::free(responses.cast());
}

unsafe extern "C" fn converse(
    num_msg: c_int,
    msg: *mut *const PamMessage,
    resp: *mut *mut PamResponse,
    appdata_ptr: *mut c_void,
) -> c_int {
    if num_msg <= 0
        || num_msg > PAM_MAX_NUM_MSG
        || msg.is_null()
        || resp.is_null()
        || appdata_ptr.is_null()
    {
        return PAM_CONV_ERR;
    }
    let slot = &*(appdata_ptr as *const ConvSlot);
    let provider = slot.provider.get();
    if provider.is_null() {
        return PAM_CONV_ERR;
    }
    let provider: &dyn SecretProvider = *(provider as *const &dyn SecretProvider);

    let count = num_msg as usize;
    let responses =
        libc::calloc(count, std::mem::size_of::<PamResponse>()).cast::<PamResponse>();
    if responses.is_null() {
        return PAM_BUF_ERR;
    }

    for i in 0..count {
        let message = *msg.add(i);
        if message.is_null() {
            continue;
        }
        let message = &*message;
        // Styles we do not know (binary prompts, radio buttons) get no answer
        let Some(style) = prompt_style(message.msg_style) else {
            debug!(msg_style = message.msg_style, "Skipping unsupported PAM message");
            continue;
        };
        let text = if message.msg.is_null() {
            Default::default()
        } else {
            CStr::from_ptr(message.msg).to_string_lossy()
        };

        let answer = provider.respond(&Prompt {
            style,
            message: &text,
        });
        if !style.expects_answer() {
            trace!(style = ?style, message = %text, "PAM message");
            continue;
        }

        let Some(secret) = answer else {
            free_responses(responses, count);
            return PAM_CONV_ERR;
        };
        let bytes = secret.expose_secret();
        let copy = libc::malloc(bytes.len() + 1).cast::<u8>();
        if copy.is_null() {
            free_responses(responses, count);
            return PAM_BUF_ERR;
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), copy, bytes.len());
        *copy.add(bytes.len()) = 0;
        (*responses.add(i)).resp = copy.cast();
    }

    *resp = responses;
    PAM_SUCCESS
}

/// Starts PAM transactions for one service name.
#[derive(Debug, Clone)]
pub struct PamService {
    service: String,
}

impl PamService {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl VerifierService for PamService {
    type Session = PamVerifier;

    fn start_session(&self, identity: &str) -> Result<PamVerifier, VerifierError> {
        if identity.is_empty() {
            return Err(VerifierError::NoIdentity);
        }
        let service = CString::new(self.service.as_str())
            .map_err(|_| VerifierError::Start("service name contains NUL".into()))?;
        let user = CString::new(identity)
            .map_err(|_| VerifierError::Start("user name contains NUL".into()))?;

        let slot = Box::new(ConvSlot {
            provider: std::cell::Cell::new(ptr::null()),
        });
        let conv = Box::new(PamConv {
            conv: Some(converse),
            appdata_ptr: &*slot as *const ConvSlot as *mut c_void,
        });

        let mut handle: *mut PamHandle = ptr::null_mut();
        // SAFETY: all pointers are valid for the call; PAM copies the strings
        // and the conversation struct, and `slot` outlives the handle.
        let status = unsafe { pam_start(service.as_ptr(), user.as_ptr(), &*conv, &mut handle) };
        if status != PAM_SUCCESS || handle.is_null() {
            let message = strerror(handle, status);
            if !handle.is_null() {
                // SAFETY: the failed transaction is never used again.
                unsafe { pam_end(handle, status) };
            }
            return Err(VerifierError::Start(message));
        }

        debug!(service = %self.service, user = %identity, "PAM transaction started");
        Ok(PamVerifier {
            handle,
            _conv: conv,
            slot,
            last_status: PAM_SUCCESS,
        })
    }
}

/// An open PAM transaction.
pub struct PamVerifier {
    handle: *mut PamHandle,
    _conv: Box<PamConv>,
    slot: Box<ConvSlot>,
    last_status: c_int,
}

impl CredentialVerifier for PamVerifier {
    fn authenticate(&mut self, secrets: &dyn SecretProvider) -> AuthResult {
        if self.handle.is_null() {
            return AuthResult::Error("PAM transaction already ended".into());
        }

        let provider: &dyn SecretProvider = secrets;
        self.slot
            .provider
            .set(&provider as *const &dyn SecretProvider as *const c_void);
        // SAFETY: the handle is live, and the provider pointer stays valid
        // until it is cleared below.
        let status = unsafe { pam_authenticate(self.handle, 0) };
        self.slot.provider.set(ptr::null());

        self.last_status = status;
        let result = auth_result(status, strerror(self.handle, status));
        trace!(status, "pam_authenticate returned");
        result
    }

    fn end_session(&mut self) {
        if self.handle.is_null() {
            return;
        }
        // SAFETY: the handle is live and is never used after this.
        let status = unsafe { pam_end(self.handle, self.last_status) };
        self.handle = ptr::null_mut();
        debug!(status, "PAM transaction ended");
    }
}

impl Drop for PamVerifier {
    fn drop(&mut self) {
        self.end_session();
    }
}
