use bramble_engine::Events;

#[test]
fn events() {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MyEvent(String);
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct OtherEvent(String);

    let mut events = Events::new();
    let my_events = events.subscribe::<MyEvent>();
    let other_events = events.subscribe::<OtherEvent>();

    events.send(MyEvent(String::from("Hello, World!")));

    for event in my_events.try_iter() {
        let other = OtherEvent(event.0.to_uppercase());
        events.send(other)
    }

    assert!(other_events
        .try_iter()
        .map(|val| val.0)
        .eq(["HELLO, WORLD!"]));
}

#[test]
fn dropped_subscribers_are_cleaned_up() {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct MyEvent(u32);

    let mut events = Events::new();

    let first = events.subscribe::<MyEvent>();
    let second = events.subscribe::<MyEvent>();

    events.send(MyEvent(1));
    assert_eq!(first.try_recv().ok(), Some(MyEvent(1)));

    drop(first);

    // The dropped subscription no longer receives, the live one still does
    events.send(MyEvent(2));
    assert!(second.try_iter().eq([MyEvent(1), MyEvent(2)]));
}
