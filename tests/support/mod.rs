//! In-memory XenAPI server speaking real XML-RPC, for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use xenapi::fault::success_envelope;
use xenapi::xmlrpc;
use xenapi::{ApiError, HttpRequest, HttpResponse, WireValue};

pub const ENDPOINT: &str = "https://pool.example/";
pub const USERNAME: &str = "root";
pub const PASSWORD: &str = "secret";

type Reply = Result<WireValue, ApiError>;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Logged {
    pub url: String,
    pub method: String,
    pub params: Vec<WireValue>,
}

/// Cloning shares the server state.
#[derive(Clone, Default)]
pub struct FakeXapi {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    sessions: HashSet<String>,
    users: BTreeMap<String, User>,
    messages: BTreeMap<String, Message>,
    controllers: BTreeMap<String, Controller>,
    tasks: BTreeMap<String, Task>,
    log: Vec<Logged>,
    coordinator: Option<String>,
    pool_member_of: Option<String>,
    clock: Option<String>,
    pending_polls: u32,
}

struct User {
    uuid: String,
    short_name: String,
    fullname: String,
    other_config: BTreeMap<String, String>,
}

struct Message {
    uuid: String,
    name: String,
    priority: i64,
    cls: String,
    obj_uuid: String,
    timestamp: String,
    body: String,
}

struct Controller {
    uuid: String,
    protocol: String,
    address: String,
    port: i64,
}

struct Task {
    uuid: String,
    status: &'static str,
    polls_left: u32,
    result_type: String,
    result: String,
    error_info: Vec<String>,
}

impl FakeXapi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request not sent to `url` with a 302 pointing there.
    pub fn redirect_to(&self, url: &str) {
        self.lock().coordinator = Some(url.to_string());
    }

    /// Reject logins with `HOST_IS_SLAVE`, naming `master`.
    pub fn act_as_pool_member(&self, master: &str) {
        self.lock().pool_member_of = Some(master.to_string());
    }

    /// Timestamp stamped on messages created from now on.
    pub fn set_clock(&self, compact: &str) {
        self.lock().clock = Some(compact.to_string());
    }

    /// How many `task.get_status` polls report `pending` for new tasks.
    pub fn set_pending_polls(&self, polls: u32) {
        self.lock().pending_polls = polls;
    }

    /// Forget every session, as a server restart would.
    pub fn drop_sessions(&self) {
        self.lock().sessions.clear();
    }

    pub fn requests(&self) -> Vec<Logged> {
        self.lock().log.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.lock().log.iter().map(|l| l.method.clone()).collect()
    }

    pub fn last_request(&self, method: &str) -> Option<Logged> {
        self.lock().log.iter().rev().find(|l| l.method == method).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let mut state = self.lock();

        if let Some(coordinator) = &state.coordinator {
            if request.url.as_str() != coordinator {
                return HttpResponse {
                    status: 302,
                    location: Some(coordinator.clone()),
                    body: Vec::new(),
                };
            }
        }

        let call = match xmlrpc::parse_method_call(&request.body) {
            Ok(call) => call,
            Err(err) => {
                return ok_response(xmlrpc::write_fault(-1, &err.message));
            }
        };
        state.log.push(Logged {
            url: request.url.to_string(),
            method: call.method.clone(),
            params: call.params.clone(),
        });

        let envelope = match state.dispatch(&call.method, &call.params) {
            Ok(value) => success_envelope(value),
            Err(err) => err.to_envelope(),
        };
        ok_response(xmlrpc::write_method_response(&envelope))
    }
}

#[cfg(feature = "blocking")]
impl xenapi::Transport for FakeXapi {
    fn send_recv(&self, request: &HttpRequest) -> xenapi::Result<HttpResponse> {
        Ok(self.handle(request))
    }
}

#[cfg(feature = "async")]
impl xenapi::AsyncTransport for FakeXapi {
    fn send_recv<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = xenapi::Result<HttpResponse>> + Send + 'a>>
    {
        Box::pin(async move { Ok(self.handle(request)) })
    }
}

fn ok_response(body: Vec<u8>) -> HttpResponse {
    HttpResponse {
        status: 200,
        location: None,
        body,
    }
}

fn fault(code: &str, params: &[&str]) -> ApiError {
    ApiError::new(code, params.iter().map(|p| p.to_string()).collect())
}

fn record(fields: Vec<(&str, WireValue)>) -> WireValue {
    WireValue::Struct(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn string_map(map: &BTreeMap<String, String>) -> WireValue {
    WireValue::Struct(
        map.iter()
            .map(|(k, v)| (k.clone(), WireValue::from(v.as_str())))
            .collect(),
    )
}

fn refs<'a>(keys: impl Iterator<Item = &'a String>) -> WireValue {
    WireValue::Array(keys.map(|k| WireValue::from(k.as_str())).collect())
}

/// Positional arguments after the session token.
struct Args<'a> {
    method: &'a str,
    params: &'a [WireValue],
}

impl<'a> Args<'a> {
    fn expect(&self, count: usize) -> Result<(), ApiError> {
        if self.params.len() == count {
            Ok(())
        } else {
            Err(fault(
                "MESSAGE_PARAMETER_COUNT_MISMATCH",
                &[
                    self.method,
                    &(count + 1).to_string(),
                    &(self.params.len() + 1).to_string(),
                ],
            ))
        }
    }

    fn value(&self, i: usize) -> Result<&'a WireValue, ApiError> {
        self.params
            .get(i)
            .ok_or_else(|| fault("MESSAGE_PARAMETER_COUNT_MISMATCH", &[self.method]))
    }

    fn str(&self, i: usize) -> Result<&'a str, ApiError> {
        match self.value(i)? {
            WireValue::String(s) | WireValue::DateTime(s) => Ok(s),
            _ => Err(fault("FIELD_TYPE_ERROR", &[&format!("arg{i}")])),
        }
    }

    fn int(&self, i: usize) -> Result<i64, ApiError> {
        match self.value(i)? {
            WireValue::Int(n) => Ok(*n),
            _ => Err(fault("FIELD_TYPE_ERROR", &[&format!("arg{i}")])),
        }
    }
}

impl State {
    fn fresh(&mut self, class: &str) -> (String, String) {
        self.next_id += 1;
        let id = self.next_id;
        (
            format!("OpaqueRef:{class}-{id}"),
            format!("{id:08x}-0000-4000-8000-{id:012x}"),
        )
    }

    fn dispatch(&mut self, method: &str, params: &[WireValue]) -> Reply {
        match method {
            "session.login_with_password" | "session.slave_local_login_with_password" => {
                return self.login(method, params);
            }
            _ => {}
        }

        let token = params.first().and_then(WireValue::as_str).unwrap_or("");
        if !self.sessions.contains(token) {
            return Err(fault("SESSION_INVALID", &[token]));
        }
        let token = token.to_string();
        let args = Args {
            method,
            params: &params[1..],
        };

        if let Some(inner) = method.strip_prefix("Async.") {
            return self.spawn_task(inner, &args);
        }

        match method {
            "session.logout" | "session.local_logout" => {
                args.expect(0)?;
                self.sessions.remove(&token);
                Ok(WireValue::void())
            }
            _ => self.call(method, &args),
        }
    }

    fn login(&mut self, method: &str, params: &[WireValue]) -> Reply {
        let args = Args { method, params };
        let host_local = method == "session.slave_local_login_with_password";
        if let Some(master) = &self.pool_member_of {
            if !host_local {
                return Err(fault("HOST_IS_SLAVE", &[master.as_str()]));
            }
        }
        let uname = args.str(0)?;
        if uname != USERNAME || args.str(1)? != PASSWORD {
            return Err(fault(
                "SESSION_AUTHENTICATION_FAILED",
                &[uname, "Authentication failure"],
            ));
        }
        let (session, _) = self.fresh("session");
        self.sessions.insert(session.clone());
        Ok(WireValue::from(session))
    }

    fn call(&mut self, method: &str, args: &Args<'_>) -> Reply {
        let (class, _) = method.split_once('.').unwrap_or((method, ""));
        match class {
            "user" => self.user(method, args),
            "message" => self.message(method, args),
            "SDN_controller" => self.controller(method, args),
            "task" => self.task(method, args),
            "pool" | "host" => self.pool(method, args),
            _ => Err(fault("MESSAGE_METHOD_UNKNOWN", &[method])),
        }
    }

    fn spawn_task(&mut self, method: &str, args: &Args<'_>) -> Reply {
        let outcome = self.call(method, args);
        let result_type = match method {
            "user.create" => "user",
            "message.create" => "message",
            "SDN_controller.introduce" => "SDN_controller",
            _ => "",
        };
        let (task_ref, uuid) = self.fresh("task");
        let task = match outcome {
            Ok(value) => Task {
                uuid,
                status: "success",
                polls_left: self.pending_polls,
                result_type: result_type.to_string(),
                result: if value.is_void() {
                    String::new()
                } else {
                    xmlrpc::write_value_fragment(&value)
                },
                error_info: Vec::new(),
            },
            Err(err) => Task {
                uuid,
                status: "failure",
                polls_left: self.pending_polls,
                result_type: String::new(),
                result: String::new(),
                error_info: std::iter::once(err.code).chain(err.params).collect(),
            },
        };
        self.tasks.insert(task_ref.clone(), task);
        Ok(WireValue::from(task_ref))
    }

    fn user(&mut self, method: &str, args: &Args<'_>) -> Reply {
        if method == "user.create" {
            args.expect(1)?;
            let fields = args.value(0)?;
            let text = |name: &str| {
                fields.member(name)
                    .and_then(WireValue::as_str)
                    .unwrap_or("")
                    .to_string()
            };
            let other_config = match fields.member("other_config") {
                Some(WireValue::Struct(members)) => members
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_str().unwrap_or("").to_string()))
                    .collect(),
                _ => BTreeMap::new(),
            };
            let (user_ref, uuid) = self.fresh("user");
            self.users.insert(
                user_ref.clone(),
                User {
                    uuid,
                    short_name: text("short_name"),
                    fullname: text("fullname"),
                    other_config,
                },
            );
            return Ok(WireValue::from(user_ref));
        }
        if method == "user.get_by_uuid" {
            let uuid = args.str(0)?;
            return self
                .users
                .iter()
                .find(|(_, u)| u.uuid == uuid)
                .map(|(r, _)| WireValue::from(r.as_str()))
                .ok_or_else(|| fault("UUID_INVALID", &["user", uuid]));
        }

        let this = args.str(0)?;
        if method == "user.destroy" {
            return match self.users.remove(this) {
                Some(_) => Ok(WireValue::void()),
                None => Err(fault("HANDLE_INVALID", &["user", this])),
            };
        }
        let user = self
            .users
            .get_mut(this)
            .ok_or_else(|| fault("HANDLE_INVALID", &["user", this]))?;
        match method {
            "user.get_record" => Ok(record(vec![
                ("uuid", WireValue::from(user.uuid.as_str())),
                ("short_name", WireValue::from(user.short_name.as_str())),
                ("fullname", WireValue::from(user.fullname.as_str())),
                ("other_config", string_map(&user.other_config)),
            ])),
            "user.get_uuid" => Ok(WireValue::from(user.uuid.as_str())),
            "user.get_short_name" => Ok(WireValue::from(user.short_name.as_str())),
            "user.get_fullname" => Ok(WireValue::from(user.fullname.as_str())),
            "user.get_other_config" => Ok(string_map(&user.other_config)),
            "user.set_fullname" => {
                args.expect(2)?;
                user.fullname = args.str(1)?.to_string();
                Ok(WireValue::void())
            }
            "user.add_to_other_config" => {
                args.expect(3)?;
                let key = args.str(1)?;
                if user.other_config.contains_key(key) {
                    return Err(fault("MAP_DUPLICATE_KEY", &["user", "other_config", this, key]));
                }
                user.other_config
                    .insert(key.to_string(), args.str(2)?.to_string());
                Ok(WireValue::void())
            }
            "user.remove_from_other_config" => {
                args.expect(2)?;
                user.other_config.remove(args.str(1)?);
                Ok(WireValue::void())
            }
            _ => Err(fault("MESSAGE_METHOD_UNKNOWN", &[method])),
        }
    }

    fn message_record(m: &Message) -> WireValue {
        record(vec![
            ("uuid", WireValue::from(m.uuid.as_str())),
            ("name", WireValue::from(m.name.as_str())),
            ("priority", WireValue::Int(m.priority)),
            ("cls", WireValue::from(m.cls.as_str())),
            ("obj_uuid", WireValue::from(m.obj_uuid.as_str())),
            ("timestamp", WireValue::DateTime(m.timestamp.clone())),
            ("body", WireValue::from(m.body.as_str())),
        ])
    }

    fn message_map<'a>(&'a self, keep: impl Fn(&Message) -> bool) -> WireValue {
        WireValue::Struct(
            self.messages
                .iter()
                .filter(|(_, m)| keep(m))
                .map(|(r, m)| (r.clone(), Self::message_record(m)))
                .collect(),
        )
    }

    fn message(&mut self, method: &str, args: &Args<'_>) -> Reply {
        match method {
            "message.create" => {
                args.expect(5)?;
                let (message_ref, uuid) = self.fresh("message");
                let timestamp = self
                    .clock
                    .clone()
                    .unwrap_or_else(|| "20240115T10:00:00Z".to_string());
                self.messages.insert(
                    message_ref.clone(),
                    Message {
                        uuid,
                        name: args.str(0)?.to_string(),
                        priority: args.int(1)?,
                        cls: args.str(2)?.to_string(),
                        obj_uuid: args.str(3)?.to_string(),
                        timestamp,
                        body: args.str(4)?.to_string(),
                    },
                );
                Ok(WireValue::from(message_ref))
            }
            "message.get_all" => Ok(refs(self.messages.keys())),
            "message.get_all_records" => Ok(self.message_map(|_| true)),
            "message.get_since" => {
                // Compact timestamps order lexically.
                let since = args.str(0)?.to_string();
                Ok(self.message_map(|m| m.timestamp > since))
            }
            "message.get" => {
                let cls = args.str(0)?.to_string();
                let obj_uuid = args.str(1)?.to_string();
                let since = args.str(2)?.to_string();
                Ok(self.message_map(|m| {
                    m.cls == cls && m.obj_uuid == obj_uuid && m.timestamp > since
                }))
            }
            "message.destroy_many" => {
                let WireValue::Array(items) = args.value(0)? else {
                    return Err(fault("FIELD_TYPE_ERROR", &["messages"]));
                };
                for item in items {
                    let r = item.as_str().unwrap_or("");
                    if !self.messages.contains_key(r) {
                        return Err(fault("HANDLE_INVALID", &["message", r]));
                    }
                }
                for item in items {
                    self.messages.remove(item.as_str().unwrap_or(""));
                }
                Ok(WireValue::void())
            }
            "message.destroy" => {
                let this = args.str(0)?;
                match self.messages.remove(this) {
                    Some(_) => Ok(WireValue::void()),
                    None => Err(fault("HANDLE_INVALID", &["message", this])),
                }
            }
            "message.get_record" => {
                let this = args.str(0)?;
                self.messages
                    .get(this)
                    .map(Self::message_record)
                    .ok_or_else(|| fault("HANDLE_INVALID", &["message", this]))
            }
            _ => Err(fault("MESSAGE_METHOD_UNKNOWN", &[method])),
        }
    }

    fn controller(&mut self, method: &str, args: &Args<'_>) -> Reply {
        match method {
            "SDN_controller.introduce" => {
                args.expect(3)?;
                let (controller_ref, uuid) = self.fresh("SDN_controller");
                self.controllers.insert(
                    controller_ref.clone(),
                    Controller {
                        uuid,
                        protocol: args.str(0)?.to_string(),
                        address: args.str(1)?.to_string(),
                        port: args.int(2)?,
                    },
                );
                return Ok(WireValue::from(controller_ref));
            }
            "SDN_controller.get_all" => return Ok(refs(self.controllers.keys())),
            "SDN_controller.get_all_records" => {
                return Ok(WireValue::Struct(
                    self.controllers
                        .iter()
                        .map(|(r, c)| (r.clone(), controller_record(c)))
                        .collect(),
                ));
            }
            _ => {}
        }

        let this = args.str(0)?;
        if method == "SDN_controller.forget" {
            return match self.controllers.remove(this) {
                Some(_) => Ok(WireValue::void()),
                None => Err(fault("HANDLE_INVALID", &["SDN_controller", this])),
            };
        }
        let controller = self
            .controllers
            .get(this)
            .ok_or_else(|| fault("HANDLE_INVALID", &["SDN_controller", this]))?;
        match method {
            "SDN_controller.get_record" => Ok(controller_record(controller)),
            "SDN_controller.get_uuid" => Ok(WireValue::from(controller.uuid.as_str())),
            "SDN_controller.get_protocol" => Ok(WireValue::from(controller.protocol.as_str())),
            "SDN_controller.get_address" => Ok(WireValue::from(controller.address.as_str())),
            "SDN_controller.get_port" => Ok(WireValue::Int(controller.port)),
            _ => Err(fault("MESSAGE_METHOD_UNKNOWN", &[method])),
        }
    }

    fn task(&mut self, method: &str, args: &Args<'_>) -> Reply {
        let this = args.str(0)?;
        if method == "task.destroy" {
            return match self.tasks.remove(this) {
                Some(_) => Ok(WireValue::void()),
                None => Err(fault("HANDLE_INVALID", &["task", this])),
            };
        }
        let task = self
            .tasks
            .get_mut(this)
            .ok_or_else(|| fault("HANDLE_INVALID", &["task", this]))?;
        match method {
            "task.get_status" => {
                if task.polls_left > 0 {
                    task.polls_left -= 1;
                    return Ok(WireValue::from("pending"));
                }
                Ok(WireValue::from(task.status))
            }
            "task.cancel" => {
                if task.polls_left == 0 {
                    return Err(fault("OPERATION_NOT_ALLOWED", &["task is finished"]));
                }
                task.polls_left = 0;
                task.status = "cancelled";
                Ok(WireValue::void())
            }
            "task.get_uuid" => Ok(WireValue::from(task.uuid.as_str())),
            "task.get_type" => Ok(WireValue::from(task.result_type.as_str())),
            "task.get_result" => Ok(WireValue::from(task.result.as_str())),
            "task.get_error_info" => Ok(WireValue::Array(
                task.error_info
                    .iter()
                    .map(|s| WireValue::from(s.as_str()))
                    .collect(),
            )),
            _ => Err(fault("MESSAGE_METHOD_UNKNOWN", &[method])),
        }
    }

    fn pool(&mut self, method: &str, _args: &Args<'_>) -> Reply {
        match method {
            "pool.get_all" => Ok(WireValue::Array(vec![WireValue::from("OpaqueRef:pool-0")])),
            "pool.get_master" => Ok(WireValue::from("OpaqueRef:host-0")),
            "host.get_API_version_major" => Ok(WireValue::Int(2)),
            "host.get_API_version_minor" => Ok(WireValue::Int(21)),
            "host.get_software_version" => Ok(record(vec![
                ("product_version", WireValue::from("8.4.0")),
                ("xapi", WireValue::from("24.19.1")),
            ])),
            _ => Err(fault("MESSAGE_METHOD_UNKNOWN", &[method])),
        }
    }
}

fn controller_record(c: &Controller) -> WireValue {
    record(vec![
        ("uuid", WireValue::from(c.uuid.as_str())),
        ("protocol", WireValue::from(c.protocol.as_str())),
        ("address", WireValue::from(c.address.as_str())),
        ("port", WireValue::Int(c.port)),
    ])
}
