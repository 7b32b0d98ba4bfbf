use nlframe::frame_codec::{ACTION_FRAME_LEN, DEFAULT_DESTINATION};
use nlframe::linux::genetlink::{CtrlAttribute, CtrlCommand, GENL_ID_CTRL};
use nlframe::linux::netlink::{
    nlmsg_align, NlmsgerrAttribute, NLA_HDRLEN, NLMSG_ERROR, NLMSG_HDRLEN, NLM_F_ACK_TLVS,
    NLM_F_CAPPED,
};
use nlframe::linux::nl80211::{Nl80211Attribute, Nl80211Command};
use nlframe::netlink_codec::{find_attribute, GenlMessage, GenlRequest, NetlinkMessage, NlMsgHeader};
use nlframe::{
    send_action_frame, CallbackRegistry, FrameError, FrameSenderConfig, HandlerAction,
    InterfaceError, InterfaceResolver, NetlinkTransport, SendFrameError, TransportConnector,
};
use pnet::datalink::MacAddr;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

const FAMILY_ID: u16 = 0x1c;
const IF_NAME: &str = "wlan1";
const IF_INDEX: u32 = 7;
const IF_MAC: MacAddr = MacAddr(0x02, 0x42, 0xc0, 0xa8, 0x64, 0x01);
const COOKIE: u64 = 0x1122_3344_5566_7788;

///////////////////////////////////////////////////////////////////////////
// Scripted kernel
///////////////////////////////////////////////////////////////////////////
#[derive(Clone)]
enum Verdict {
    Accept,
    Reject(i32, &'static str),
}

#[derive(Default)]
struct KernelLog {
    sent: Vec<Vec<u8>>,
    queued: VecDeque<Vec<u8>>,
}

struct MockKernel {
    log: Rc<RefCell<KernelLog>>,
    verdict: Verdict,
}

fn ack(request: &NlMsgHeader) -> Vec<u8> {
    error_reply(0, request, 0, &[])
}

fn error_reply(error: i32, request: &NlMsgHeader, flags: u16, tlvs: &[u8]) -> Vec<u8> {
    let mut payload = error.to_ne_bytes().to_vec();
    payload.extend(request.serialize());
    payload.extend_from_slice(tlvs);

    let mut bytes = NlMsgHeader {
        length: (NLMSG_HDRLEN + payload.len()) as u32,
        message_type: NLMSG_ERROR,
        flags,
        sequence: request.sequence,
        port_id: 4242,
    }
    .serialize();
    bytes.extend(payload);
    bytes
}

fn message_attribute(text: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&((NLA_HDRLEN + text.len()) as u16).to_ne_bytes());
    bytes.extend_from_slice(&u16::from(NlmsgerrAttribute::Msg).to_ne_bytes());
    bytes.extend_from_slice(text.as_bytes());
    bytes.resize(nlmsg_align(bytes.len()), 0);
    bytes
}

impl MockKernel {
    fn reply_to(&self, request: &NlMsgHeader) -> Vec<u8> {
        if request.message_type == GENL_ID_CTRL {
            let mut reply = GenlRequest::new(GENL_ID_CTRL, CtrlCommand::NewFamily.into(), 2);
            reply.put_string(CtrlAttribute::FamilyName.into(), "nl80211").unwrap();
            reply.put_u16(CtrlAttribute::FamilyId.into(), FAMILY_ID).unwrap();
            let mut batch = reply.finish(request.sequence, 4242).unwrap();
            batch.extend(ack(request));
            return batch;
        }

        match self.verdict {
            Verdict::Accept => {
                let mut reply = GenlRequest::new(FAMILY_ID, Nl80211Command::Frame.into(), 0);
                reply.put_u64(Nl80211Attribute::Cookie.into(), COOKIE).unwrap();
                let mut batch = reply.finish(request.sequence, 4242).unwrap();
                batch.extend(ack(request));
                batch
            }
            Verdict::Reject(error, text) => error_reply(
                error,
                request,
                NLM_F_CAPPED | NLM_F_ACK_TLVS,
                &message_attribute(text),
            ),
        }
    }
}

impl NetlinkTransport for MockKernel {
    fn send(&mut self, message: &[u8]) -> io::Result<usize> {
        let (_, header) = NlMsgHeader::parse(message).unwrap();
        let reply = self.reply_to(&header);

        let mut log = self.log.borrow_mut();
        log.sent.push(message.to_vec());
        log.queued.push_back(reply);
        Ok(message.len())
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let Some(reply) = self.log.borrow_mut().queued.pop_front() else {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        };
        buffer[..reply.len()].copy_from_slice(&reply);
        Ok(reply.len())
    }
}

struct MockConnector {
    log: Rc<RefCell<KernelLog>>,
    verdict: Verdict,
    connected: Cell<bool>,
}

impl MockConnector {
    fn new(verdict: Verdict) -> Self {
        Self {
            log: Default::default(),
            verdict,
            connected: Cell::new(false),
        }
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.log.borrow().sent.clone()
    }
}

impl TransportConnector for MockConnector {
    type Transport = MockKernel;

    fn connect(&self) -> io::Result<MockKernel> {
        self.connected.set(true);
        Ok(MockKernel {
            log: Rc::clone(&self.log),
            verdict: self.verdict.clone(),
        })
    }
}

struct FixedResolver {
    mac: Option<MacAddr>,
}

impl InterfaceResolver for FixedResolver {
    fn resolve_index(&self, name: &str) -> u32 {
        if name == IF_NAME {
            IF_INDEX
        } else {
            0
        }
    }

    fn resolve_mac(&self, name: &str) -> Result<MacAddr, InterfaceError> {
        self.mac.ok_or_else(|| InterfaceError::IoctlFailed {
            name: name.to_string(),
            source: io::Error::from_raw_os_error(libc::ENODEV),
        })
    }
}

const RESOLVER: FixedResolver = FixedResolver { mac: Some(IF_MAC) };

fn frame_message(sent: &[u8]) -> GenlMessage<'_> {
    let (_, header) = NlMsgHeader::parse(sent).unwrap();
    assert_eq!(header.message_type, FAMILY_ID);
    let (_, genl) = GenlMessage::parse(&sent[NLMSG_HDRLEN..]).unwrap();
    assert_eq!(genl.command, u8::from(Nl80211Command::Frame));
    genl
}

///////////////////////////////////////////////////////////////////////////
// Scenarios
///////////////////////////////////////////////////////////////////////////
#[test]
fn frame_is_sent_and_acked() {
    let connector = MockConnector::new(Verdict::Accept);
    let config = FrameSenderConfig::default();

    let cookie = Rc::new(Cell::new(None));
    let captured = Rc::clone(&cookie);
    let mut registry = CallbackRegistry::new();
    registry.register(move |message: &NetlinkMessage<'_>| {
        let (_, genl) = GenlMessage::parse(message.payload).unwrap();
        let attributes = genl.attributes();
        captured.set(find_attribute(&attributes, Nl80211Attribute::Cookie.into()).and_then(|e| e.as_u64()));
        HandlerAction::Continue
    });

    send_action_frame(&config, &RESOLVER, &connector, &mut registry).unwrap();
    assert_eq!(cookie.get(), Some(COOKIE));

    // family lookup, then the frame
    let sent = connector.sent();
    assert_eq!(sent.len(), 2);
    let genl = frame_message(&sent[1]);
    let attributes = genl.attributes();

    let if_index = find_attribute(&attributes, Nl80211Attribute::IfIndex.into()).unwrap();
    assert_eq!(if_index.as_u32(), Some(IF_INDEX));
    let frequency = find_attribute(&attributes, Nl80211Attribute::WiphyFreq.into()).unwrap();
    assert_eq!(frequency.as_u32(), Some(5220));

    let frame = find_attribute(&attributes, Nl80211Attribute::Frame.into()).unwrap();
    assert_eq!(frame.payload.len(), ACTION_FRAME_LEN);
    assert_eq!(&frame.payload[..2], &[0xD0, 0x00]);
    assert_eq!(&frame.payload[4..10], &DEFAULT_DESTINATION.octets());
    assert_eq!(&frame.payload[10..16], &IF_MAC.octets());
    assert_eq!(&frame.payload[16..22], &IF_MAC.octets());
}

#[test]
fn unknown_interface_opens_no_socket() {
    let connector = MockConnector::new(Verdict::Accept);
    let config = FrameSenderConfig {
        interface: "wlan9".to_string(),
        ..Default::default()
    };

    let error = send_action_frame(&config, &RESOLVER, &connector, &mut CallbackRegistry::new())
        .unwrap_err();
    assert!(matches!(error, SendFrameError::InterfaceNotFound(ref name) if name == "wlan9"));
    assert_eq!(error.exit_code(), 1);
    assert!(!connector.connected.get());
    assert!(connector.sent().is_empty());
}

#[test]
fn small_buffer_sends_no_frame() {
    let connector = MockConnector::new(Verdict::Accept);
    let config = FrameSenderConfig {
        buffer_capacity: 50,
        ..Default::default()
    };

    let error = send_action_frame(&config, &RESOLVER, &connector, &mut CallbackRegistry::new())
        .unwrap_err();
    assert!(matches!(
        error,
        SendFrameError::FrameConstruction(FrameError::BufferTooSmall {
            required: 126,
            capacity: 50
        })
    ));
    assert_eq!(error.exit_code(), 8);

    // only the family lookup went out
    let sent = connector.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(NlMsgHeader::parse(&sent[0]).unwrap().1.message_type, GENL_ID_CTRL);
}

#[test]
fn oversized_buffer_is_allocation_failure() {
    let connector = MockConnector::new(Verdict::Accept);
    let config = FrameSenderConfig {
        buffer_capacity: usize::MAX,
        ..Default::default()
    };

    let error = send_action_frame(&config, &RESOLVER, &connector, &mut CallbackRegistry::new())
        .unwrap_err();
    assert!(matches!(
        error,
        SendFrameError::BufferAllocation {
            capacity: usize::MAX,
            ..
        }
    ));
    assert_eq!(error.exit_code(), 2);

    // only the family lookup went out
    let sent = connector.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(NlMsgHeader::parse(&sent[0]).unwrap().1.message_type, GENL_ID_CTRL);
}

#[test]
fn missing_hardware_address_is_frame_construction_failure() {
    let connector = MockConnector::new(Verdict::Accept);
    let resolver = FixedResolver { mac: None };

    let error = send_action_frame(
        &FrameSenderConfig::default(),
        &resolver,
        &connector,
        &mut CallbackRegistry::new(),
    )
    .unwrap_err();
    assert!(matches!(error, SendFrameError::MacAddress(_)));
    assert_eq!(error.exit_code(), 8);
    assert_eq!(connector.sent().len(), 1);
}

#[test]
fn kernel_rejection_is_terminal_failure() {
    let connector = MockConnector::new(Verdict::Reject(-libc::EOPNOTSUPP, "frame TX not supported"));

    let error = send_action_frame(
        &FrameSenderConfig::default(),
        &RESOLVER,
        &connector,
        &mut CallbackRegistry::new(),
    )
    .unwrap_err();
    assert!(matches!(error, SendFrameError::TransactionFailed(code) if code == -libc::EOPNOTSUPP));
    assert_eq!(error.exit_code(), 1);
    assert_eq!(connector.sent().len(), 2);
}

#[test]
fn frequency_can_be_omitted() {
    let connector = MockConnector::new(Verdict::Accept);
    let config = FrameSenderConfig {
        frequency: None,
        ..Default::default()
    };

    send_action_frame(&config, &RESOLVER, &connector, &mut CallbackRegistry::new()).unwrap();

    let sent = connector.sent();
    let genl = frame_message(&sent[1]);
    let attributes = genl.attributes();
    assert!(find_attribute(&attributes, Nl80211Attribute::WiphyFreq.into()).is_none());
    assert!(find_attribute(&attributes, Nl80211Attribute::Frame.into()).is_some());
}
