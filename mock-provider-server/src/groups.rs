// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

#[endpoint {
    method = GET,
    path = "/v2/Groups"
}]
pub async fn list_groups(
    rqctx: RequestContext<Arc<ServerContext>>,
    query_params: Query<ListQuery>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, &[]) {
        return response.map_err(HttpError::from);
    }

    let query_params = query_params.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match apictx.store().list_groups(&query_params) {
            Ok(list) => json_response(StatusCode::OK, &list),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[derive(Deserialize, JsonSchema)]
pub struct GroupPathParam {
    group_id: String,
}

#[endpoint {
    method = GET,
    path = "/v2/Groups/{group_id}"
}]
pub async fn get_group(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<GroupPathParam>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, &[]) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match apictx.store().get_group(&path_param.group_id) {
            Ok(group) => json_response(StatusCode::OK, &group),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = POST,
    path = "/v2/Groups",
}]
pub async fn create_group(
    rqctx: RequestContext<Arc<ServerContext>>,
    body: UntypedBody,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, body.as_bytes()) {
        return response.map_err(HttpError::from);
    }

    let result: Result<Response<Body>, http::Error> = match parse_body(&body)
        .and_then(|group| apictx.store().create_group(group))
    {
        Ok(group) => json_response(StatusCode::CREATED, &group),
        Err(error) => error.to_http_response(),
    };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = PUT,
    path = "/v2/Groups/{group_id}"
}]
pub async fn put_group(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<GroupPathParam>,
    body: UntypedBody,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, body.as_bytes()) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match parse_body(&body).and_then(|group| {
            apictx.store().replace_group(&path_param.group_id, group)
        }) {
            Ok(group) => json_response(StatusCode::OK, &group),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = PATCH,
    path = "/v2/Groups/{group_id}"
}]
pub async fn patch_group(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<GroupPathParam>,
    body: UntypedBody,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, body.as_bytes()) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match parse_body(&body).and_then(|request| {
            apictx.store().patch_group(&path_param.group_id, request)
        }) {
            Ok(group) => json_response(StatusCode::OK, &group),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}

#[endpoint {
    method = DELETE,
    path = "/v2/Groups/{group_id}"
}]
pub async fn delete_group(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<GroupPathParam>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    if let Some(response) = apictx.intercept(&rqctx.request, &[]) {
        return response.map_err(HttpError::from);
    }

    let path_param = path_param.into_inner();

    let result: Result<Response<Body>, http::Error> =
        match apictx.store().delete_group(&path_param.group_id) {
            Ok(()) => deleted_http_response(),
            Err(error) => error.to_http_response(),
        };

    result.map_err(HttpError::from)
}
